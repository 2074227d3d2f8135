use memchr::memchr;

#[inline]
fn digit(byte: u8) -> Option<i32> {
    byte.is_ascii_digit().then(|| (byte - b'0') as i32)
}

/// Parses a reading as tenths ("12.3" becomes 123).
///
/// Only the three fixed shapes `-99.9`, `-9.9`/`99.9` and `9.9` are accepted,
/// dispatched on length; anything else yields `None`.
#[inline]
pub fn parse_tenths(bytes: &[u8]) -> Option<i32> {
    match *bytes {
        [b'-', a, b, b'.', c] => Some(-(100 * digit(a)? + 10 * digit(b)? + digit(c)?)),
        [b'-', a, b'.', c] => Some(-(10 * digit(a)? + digit(c)?)),
        [a, b, b'.', c] => Some(100 * digit(a)? + 10 * digit(b)? + digit(c)?),
        [a, b'.', c] => Some(10 * digit(a)? + digit(c)?),
        _ => None,
    }
}

/// Splits a line (without its terminator) at the first `;` into the station
/// name and its reading in tenths.
#[inline]
pub fn parse_line(line: &[u8]) -> Option<(&[u8], i32)> {
    let semicolon_pos = memchr(b';', line)?;
    let reading = parse_tenths(&line[semicolon_pos + 1..])?;
    Some((&line[..semicolon_pos], reading))
}
