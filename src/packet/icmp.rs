use super::Family;

pub const ICMP_ECHO_REPLY: u8 = 0;
pub const ICMP_ECHO_REQUEST: u8 = 8;
pub const ICMP_TIME_EXCEEDED: u8 = 11;

pub const ICMPV6_TIME_EXCEEDED: u8 = 3;
pub const ICMPV6_ECHO_REQUEST: u8 = 128;
pub const ICMPV6_ECHO_REPLY: u8 = 129;

/// Code 0 of Time Exceeded in both families: hop limit exceeded in transit.
pub const CODE_TTL_EXCEEDED_IN_TRANSIT: u8 = 0;

pub fn echo_request_type(family: Family) -> u8 {
    match family {
        Family::V4 => ICMP_ECHO_REQUEST,
        Family::V6 => ICMPV6_ECHO_REQUEST,
    }
}

pub fn echo_reply_type(family: Family) -> u8 {
    match family {
        Family::V4 => ICMP_ECHO_REPLY,
        Family::V6 => ICMPV6_ECHO_REPLY,
    }
}

pub fn time_exceeded_type(family: Family) -> u8 {
    match family {
        Family::V4 => ICMP_TIME_EXCEEDED,
        Family::V6 => ICMPV6_TIME_EXCEEDED,
    }
}

pub fn is_echo(family: Family, icmp_type: u8) -> bool {
    icmp_type == echo_request_type(family) || icmp_type == echo_reply_type(family)
}

pub fn is_time_exceeded(family: Family, icmp_type: u8) -> bool {
    icmp_type == time_exceeded_type(family)
}

/// Human readable name of a message type, used by the command line output.
pub fn type_name(family: Family, icmp_type: u8) -> &'static str {
    match (family, icmp_type) {
        (Family::V4, 0) => "Echo Reply",
        (Family::V4, 3) => "Destination Unreachable",
        (Family::V4, 5) => "Redirect",
        (Family::V4, 8) => "Echo Request",
        (Family::V4, 11) => "Time Exceeded",
        (Family::V4, 12) => "Parameter Problem",
        (Family::V6, 1) => "Destination Unreachable",
        (Family::V6, 2) => "Packet Too Big",
        (Family::V6, 3) => "Time Exceeded",
        (Family::V6, 4) => "Parameter Problem",
        (Family::V6, 128) => "Echo Request",
        (Family::V6, 129) => "Echo Reply",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_designations() {
        assert_eq!(echo_request_type(Family::V4), 8);
        assert_eq!(echo_request_type(Family::V6), 128);
        assert_eq!(time_exceeded_type(Family::V4), 11);
        assert_eq!(time_exceeded_type(Family::V6), 3);
    }

    #[test]
    fn test_type_classification() {
        assert!(is_echo(Family::V4, ICMP_ECHO_REPLY));
        assert!(!is_echo(Family::V6, ICMP_ECHO_REPLY));
        assert!(is_time_exceeded(Family::V6, ICMPV6_TIME_EXCEEDED));
        // 3 is Destination Unreachable on IPv4
        assert!(!is_time_exceeded(Family::V4, 3));
        assert_eq!(type_name(Family::V4, 3), "Destination Unreachable");
        assert_eq!(type_name(Family::V6, 3), "Time Exceeded");
    }
}
