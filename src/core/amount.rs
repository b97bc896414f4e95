//! Legal-text currency rendering.
//!
//! Financial documents carry amounts in ideographic anti-fraud numerals
//! (`壹仟伍佰叁拾元整` for 1530). Rendering works on whole cents so that the
//! second fraction digit is rounded half-up exactly once.

/// Anti-fraud numerals for 0-9.
const DIGITS: [char; 10] = ['零', '壹', '贰', '叁', '肆', '伍', '陆', '柒', '捌', '玖'];
/// Place-value suffixes within a 4-digit group.
const UNITS: [&str; 4] = ["", "拾", "佰", "仟"];
/// Grand units applied every 4 digits.
const GRAND: [&str; 3] = ["", "万", "亿"];

/// Renders a non-negative decimal amount as legal-text currency.
pub fn to_legal_text(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    if cents == 0 {
        return "零元整".to_string();
    }
    let yuan = (cents / 100) as u64;
    let jiao = ((cents % 100) / 10) as usize;
    let fen = (cents % 10) as usize;

    let mut out = if yuan == 0 {
        String::from("零")
    } else {
        integer_part(yuan)
    };
    out.push('元');

    if jiao == 0 && fen == 0 {
        out.push('整');
    } else {
        if jiao > 0 {
            out.push(DIGITS[jiao]);
            out.push('角');
        }
        if fen > 0 {
            if jiao == 0 {
                out.push(DIGITS[0]);
            }
            out.push(DIGITS[fen]);
            out.push('分');
        }
    }
    out
}

/// Renders the integer yuan part, most-significant digit first. Runs of zero
/// digits collapse to a single deferred `零`, grand units are emitted only
/// for groups that contain a nonzero digit, and trailing zeros are dropped.
fn integer_part(n: u64) -> String {
    let digits: Vec<usize> = n
        .to_string()
        .bytes()
        .map(|b| usize::from(b - b'0'))
        .collect();
    let len = digits.len();
    let mut out = String::new();
    let mut pending_zero = false;
    let mut group_has_digit = false;

    for (i, &d) in digits.iter().enumerate() {
        let pos = len - 1 - i;
        if d != 0 {
            if pending_zero && !out.is_empty() {
                out.push(DIGITS[0]);
            }
            pending_zero = false;
            out.push(DIGITS[d]);
            out.push_str(UNITS[pos % 4]);
            group_has_digit = true;
        } else {
            pending_zero = true;
        }
        if pos % 4 == 0 {
            if group_has_digit {
                out.push_str(GRAND.get(pos / 4).copied().unwrap_or(""));
            }
            group_has_digit = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_amounts() {
        assert_eq!(to_legal_text(0.0), "零元整");
        assert_eq!(to_legal_text(1530.0), "壹仟伍佰叁拾元整");
        assert_eq!(to_legal_text(45.5), "肆拾伍元伍角");
        assert_eq!(to_legal_text(100.05), "壹佰元零伍分");
    }

    #[test]
    fn test_interior_zero_runs_collapse() {
        assert_eq!(to_legal_text(1005.0), "壹仟零伍元整");
        assert_eq!(to_legal_text(100500.0), "壹拾万零伍佰元整");
        assert_eq!(to_legal_text(100000008.0), "壹亿零捌元整");
    }

    #[test]
    fn test_grand_units() {
        assert_eq!(to_legal_text(10000.0), "壹万元整");
        assert_eq!(to_legal_text(123456.0), "壹拾贰万叁仟肆佰伍拾陆元整");
        // An all-zero middle group must not surface its grand unit.
        assert_eq!(to_legal_text(100000000.0), "壹亿元整");
    }

    #[test]
    fn test_fractional_parts() {
        assert_eq!(to_legal_text(130.0), "壹佰叁拾元整");
        assert_eq!(to_legal_text(0.5), "零元伍角");
        assert_eq!(to_legal_text(0.05), "零元零伍分");
        assert_eq!(to_legal_text(250.31), "贰佰伍拾元叁角壹分");
    }

    #[test]
    fn test_second_digit_rounding() {
        assert_eq!(to_legal_text(1.999), "贰元整");
        assert_eq!(to_legal_text(2.004), "贰元整");
        assert_eq!(to_legal_text(0.996), "壹元整");
    }
}
