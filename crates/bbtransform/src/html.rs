//! HTML text filter.
//!
//! [`HtmlFilter`] escapes the characters HTML reserves and, when the enclosing
//! tag's policy asks for it, turns newlines into `<br>`. Every substitution is
//! recorded in the [`Offsets`] ledger at the source position of the replaced
//! characters, so rendered positions can be mapped back to the markup.
//!
//! | Source | Output | Delta |
//! |--------|--------|-------|
//! | `<`    | `&lt;`   | +3 |
//! | `>`    | `&gt;`   | +3 |
//! | `&`    | `&amp;`  | +4 |
//! | `"`    | `&quot;` | +5 |
//! | `\r\n` | `<br>`   | +2 |
//! | `\n`   | `<br>`   | +3 |

use crate::offsets::Offsets;
use crate::registry::TagPolicy;
use crate::transformer::TextFilter;

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlFilter;

impl TextFilter for HtmlFilter {
    fn filter(
        &self,
        text: &str,
        position: usize,
        policy: &TagPolicy,
        offsets: &mut Offsets,
        out: &mut String,
    ) {
        let bytes = text.as_bytes();
        let mut last = 0;
        let mut i = 0;

        while i < bytes.len() {
            let (replacement, consumed) = match bytes[i] {
                b'<' => ("&lt;", 1),
                b'>' => ("&gt;", 1),
                b'&' => ("&amp;", 1),
                b'"' => ("&quot;", 1),
                b'\r' if policy.normalize_line_breaks && bytes.get(i + 1) == Some(&b'\n') => {
                    ("<br>", 2)
                }
                b'\n' if policy.normalize_line_breaks => ("<br>", 1),
                _ => {
                    i += 1;
                    continue;
                }
            };

            out.push_str(&text[last..i]);
            out.push_str(replacement);
            offsets.add(position + i, replacement.len() as isize - consumed as isize);
            i += consumed;
            last = i;
        }

        out.push_str(&text[last..]);
    }
}
