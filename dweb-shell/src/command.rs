/// One line of user input, newline already stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,                // blank line
    Quit,                 // q
    Follow(i64),          // <number>
    Visit(Vec<u8>),       // anything else goes to the browser byte for byte
}

pub fn parse_command(input: &[u8]) -> Command {
    if input.is_empty() {
        return Command::Empty;
    }
    if input == b"q" {
        return Command::Quit;
    }
    match parse_index(input) {
        Some(n) => Command::Follow(n),
        None => Command::Visit(input.to_vec()),
    }
}

/// Whole-line integer: leading whitespace, an optional sign, then digits to
/// the end. Magnitudes beyond `i64` saturate.
fn parse_index(input: &[u8]) -> Option<i64> {
    let s = input.trim_ascii_start();
    let (negative, digits) = match s.first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    let magnitude = digits.iter().fold(0i64, |acc, b| {
        acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
    });
    Some(if negative { -magnitude } else { magnitude })
}
