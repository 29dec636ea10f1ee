//! Help text rendering (Telegram legacy Markdown).
//!
//! ```text
//! brief:  */start* - _Start using Telegram bot._
//! full:   */start* - _Start using Telegram bot._
//!         Usage: `/start`
//!         Example: `/start`          (only when an example exists)
//! ```

use crate::registry::CommandDescriptor;

/// Header of the combined `/help` listing.
pub const HELP_HEADER: &str = "*Help*";

/// One-line form: name and description.
pub fn render_brief(descriptor: &CommandDescriptor) -> String {
    format!("*/{}* - _{}_", descriptor.name, descriptor.help.info)
}

/// Brief form plus usage and, when present, an example.
pub fn render_full(descriptor: &CommandDescriptor) -> String {
    let mut out = render_brief(descriptor);
    out.push_str(&format!("\nUsage: `{}`", descriptor.help.usage));
    if let Some(example) = &descriptor.help.example {
        out.push_str(&format!("\nExample: `{example}`"));
    }
    out
}

/// The `/help` reply: header followed by the full form of every command.
pub fn render_listing<'a>(descriptors: impl IntoIterator<Item = &'a CommandDescriptor>) -> String {
    let mut out = HELP_HEADER.to_owned();
    for descriptor in descriptors {
        out.push('\n');
        out.push_str(&render_full(descriptor));
    }
    out
}
