// marquee-cli/src/rendering.rs
use termimad::MadSkin;

/// Prints markdown text formatted to the terminal. Answers are short, so the
/// default skin is enough.
pub fn print_formatted(markdown_text: &str) {
    let skin = MadSkin::default();
    skin.print_text(markdown_text);
}
