//! Net name ranking
//!
//! When two nets merge, the survivor is the one with the better name.
//! Operator names beat `component.pin` labels, which beat generated
//! `net-NNN` ids. The order is total so merges are symmetric.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NameClass {
    Operator,
    PinLabel,
    Generated,
}

/// `net-` followed by digits only, or an empty name
pub fn is_generated_name(name: &str) -> bool {
    match name.strip_prefix("net-") {
        Some(rest) => !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()),
        None => name.is_empty(),
    }
}

/// `U1.3`, `J2.A4`: a component reference and a pin, no whitespace
pub fn is_pin_label(name: &str) -> bool {
    match name.split_once('.') {
        Some((component, pin)) => {
            !component.is_empty()
                && !pin.is_empty()
                && !pin.contains('.')
                && !name.contains(char::is_whitespace)
        }
        None => false,
    }
}

pub fn classify(name: &str) -> NameClass {
    if is_generated_name(name) {
        NameClass::Generated
    } else if is_pin_label(name) {
        NameClass::PinLabel
    } else {
        NameClass::Operator
    }
}

/// `Less` means `a` is the better name
pub fn compare_names(a: &str, b: &str) -> Ordering {
    classify(a)
        .cmp(&classify(b))
        .then_with(|| a.len().cmp(&b.len()))
        .then_with(|| a.cmp(b))
}

pub fn better_name(a: &str, b: &str) -> bool {
    compare_names(a, b) != Ordering::Greater
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("net-005"), NameClass::Generated);
        assert_eq!(classify(""), NameClass::Generated);
        assert_eq!(classify("U1.3"), NameClass::PinLabel);
        assert_eq!(classify("VCC"), NameClass::Operator);
        assert_eq!(classify("net-GND"), NameClass::Operator);
        assert_eq!(classify("3.3V rail"), NameClass::Operator);
    }

    #[test]
    fn test_operator_name_wins() {
        assert!(better_name("VCC", "net-005"));
        assert!(!better_name("net-005", "VCC"));
        assert!(better_name("U1.3", "net-001"));
        assert!(better_name("GND", "U1.3"));
    }

    #[test]
    fn test_order_is_total() {
        assert_eq!(compare_names("A", "B"), Ordering::Less);
        assert_eq!(compare_names("VCC", "VCC_IO"), Ordering::Less);
        assert_eq!(compare_names("net-002", "net-001"), Ordering::Greater);
        assert_eq!(compare_names("X", "X"), Ordering::Equal);
    }
}
