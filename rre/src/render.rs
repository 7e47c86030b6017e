use crate::ByteRangeSet;

/// The byte used to stand for `set`: the smallest graphic ASCII member if there is one,
/// otherwise the smallest member.
pub fn representative(set: &ByteRangeSet) -> Option<u8> {
    set.iter()
        .find(u8::is_ascii_graphic)
        .or_else(|| set.iter().next())
}

/// Renders one representative byte per set. Bytes outside of graphic ASCII are written as `\`
/// followed by their decimal value.
pub fn render(consumed: &[ByteRangeSet]) -> String {
    let mut rendered = String::new();
    for byte in consumed.iter().filter_map(representative) {
        if byte.is_ascii_graphic() {
            rendered.push(char::from(byte));
        } else {
            rendered.push('\\');
            rendered.push_str(&byte.to_string());
        }
    }
    rendered
}
