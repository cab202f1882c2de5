//! "How is <name> doing" answers, checked before the keyword table.
//!
//! A ranked person matches when any token of their display name longer than
//! two characters appears in the lowercased message. Candidates are tried in
//! rank order so the higher-ranked person wins a shared token.

use crate::models::{CloserInsights, SetterInsights};
use crate::responses;

fn mentions(name: &str, message: &str) -> bool {
    name.split_whitespace()
        .filter(|token| token.chars().count() > 2)
        .any(|token| message.contains(&token.to_lowercase()))
}

pub fn lookup_closer_mention(message: &str, insights: Option<&CloserInsights>) -> Option<String> {
    let insights = insights?;
    let message = message.to_lowercase();
    let matched = insights
        .top_closers
        .iter()
        .find(|closer| mentions(&closer.name, &message))?;
    let rank = insights
        .top_closers
        .iter()
        .position(|closer| closer.name == matched.name)?
        + 1;
    Some(responses::closer_spotlight(matched, rank, insights))
}

pub fn lookup_setter_mention(message: &str, insights: Option<&SetterInsights>) -> Option<String> {
    let insights = insights?;
    let message = message.to_lowercase();
    let matched = insights
        .top_setters
        .iter()
        .find(|setter| mentions(&setter.name, &message))?;
    let rank = insights
        .top_setters
        .iter()
        .position(|setter| setter.name == matched.name)?
        + 1;
    Some(responses::setter_spotlight(matched, rank, insights))
}
