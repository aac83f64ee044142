//! Label filter: decides which raw device-model strings are worth a provider call.

/// Labels of this many characters or fewer carry too little signal to map.
pub const MIN_LABEL_CHARS: usize = 5;

/// Why a label was dropped. Rules are checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Absent or empty field
    Empty,
    /// Four characters or fewer
    TooShort,
    /// Only ASCII decimal digits
    AllDigits,
    /// Only CJK Unified Ideographs (U+4E00..=U+9FFF)
    AllCjk,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Empty => write!(f, "empty"),
            SkipReason::TooShort => write!(f, "too short"),
            SkipReason::AllDigits => write!(f, "all digits"),
            SkipReason::AllCjk => write!(f, "all CJK"),
        }
    }
}

/// Return the first drop rule that matches `label`, or `None` to keep it.
pub fn classify(label: Option<&str>) -> Option<SkipReason> {
    let label = match label {
        Some(l) if !l.is_empty() => l,
        _ => return Some(SkipReason::Empty),
    };

    if label.chars().count() < MIN_LABEL_CHARS {
        return Some(SkipReason::TooShort);
    }
    if label.chars().all(|c| c.is_ascii_digit()) {
        return Some(SkipReason::AllDigits);
    }
    if label.chars().all(is_cjk_ideograph) {
        return Some(SkipReason::AllCjk);
    }
    None
}

/// True when `label` should not be sent to the providers.
pub fn should_skip(label: Option<&str>) -> bool {
    classify(label).is_some()
}

fn is_cjk_ideograph(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
}
