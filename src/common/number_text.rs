//! Spreadsheet-style rendering of numbers as text.
//!
//! Numbers are rounded to 15 significant digits. Plain notation is used
//! unless the integer part would exceed 20 digits or a fraction would need
//! more than 20 characters, in which case the form is `1.5E+20` / `1E-21`.

const MAX_TEXT_LEN: usize = 20;
const SIGNIFICANT_DIGITS: usize = 15;

/// Digits (without trailing zeros) and decimal exponent of `value`.
fn decompose(value: f64) -> (String, i32) {
    let formatted = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, value);
    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((&formatted, "0"));
    let exponent = exponent.parse::<i32>().unwrap_or(0);
    let mut digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    while digits.len() > 1 && digits.ends_with('0') {
        digits.pop();
    }
    (digits, exponent)
}

fn push_exponent(out: &mut String, digits: &str, sign: char, exponent: i32) {
    out.push_str(&digits[..1]);
    if digits.len() > 1 {
        out.push('.');
        out.push_str(&digits[1..]);
    }
    out.push('E');
    out.push(sign);
    out.push_str(&format!("{:02}", exponent));
}

/// Text of `value` as a spreadsheet cell would display it in General format.
pub fn number_to_text(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let mut out = String::new();
    if value < 0.0 {
        out.push('-');
    }
    let (digits, exponent) = decompose(value.abs());
    let count = digits.len();

    if exponent < 0 {
        let leading_zeros = (-exponent - 1) as usize;
        if 2 + leading_zeros + count > MAX_TEXT_LEN {
            push_exponent(&mut out, &digits, '-', -exponent);
            return out;
        }
        out.push_str("0.");
        out.extend(std::iter::repeat_n('0', leading_zeros));
        out.push_str(&digits);
        return out;
    }

    if exponent > 19 {
        push_exponent(&mut out, &digits, '+', exponent);
        return out;
    }
    let int_len = exponent as usize + 1;
    if count > int_len {
        out.push_str(&digits[..int_len]);
        out.push('.');
        out.push_str(&digits[int_len..]);
    } else {
        out.push_str(&digits);
        out.extend(std::iter::repeat_n('0', int_len - count));
    }
    out
}
