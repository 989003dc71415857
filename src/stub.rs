// src/stub.rs

//! Bootstrap stub handling
//!
//! The bootstrap is the PHP preamble at the top of every PHAR. It maps the
//! archive and includes the real entry point from inside it.

/// Interpreter directive marker
const SHEBANG: &[u8] = b"#!";

/// Halt marker terminating the stub; everything after it is archive data
pub const HALT_MARKER: &str = "__HALT_COMPILER(); ?>";

/// Bytes written after the halt marker before the manifest starts
pub const STUB_TERMINATOR: &str = "\r\n";

/// Strip a leading interpreter directive line
///
/// A `#!` line at the very start of the content is removed up to and
/// including its line break. Content without one is returned unchanged.
///
/// ```
/// use pharpack::stub::rewrite_stub;
///
/// assert_eq!(rewrite_stub(b"#!/usr/bin/env php\n<?php run();"), b"<?php run();");
/// assert_eq!(rewrite_stub(b"<?php run();"), b"<?php run();");
/// ```
pub fn rewrite_stub(content: &[u8]) -> Vec<u8> {
    if !content.starts_with(SHEBANG) {
        return content.to_vec();
    }

    match content.iter().position(|&b| b == b'\n') {
        Some(end) => content[end + 1..].to_vec(),
        None => Vec::new(),
    }
}

/// Render the bootstrap stub for an archive
///
/// `entry` must already be archive-relative. The result ends with the halt
/// marker and the stub terminator. Both names are escaped for the PHP
/// double-quoted literal they end up in.
pub fn bootstrap_stub(alias: &str, entry: &str) -> String {
    let alias = escape_php_string(alias);
    let entry = escape_php_string(entry);
    format!(
        "#!/usr/bin/env php\n<?php Phar::mapPhar(); include \"phar://{alias}/{entry}\"; {HALT_MARKER}{STUB_TERMINATOR}"
    )
}

/// Escape `\`, `$` and `"` for a PHP double-quoted string
fn escape_php_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '$' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
