//! Reply templates for the chat assistant.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{
    AssistantContext, CloserInsights, CloserSummary, Role, SetterInsights, SetterSummary,
    SheetSnapshot,
};

pub const DISPLAYED_CLOSERS: usize = 5;
pub const DISPLAYED_SETTERS: usize = 5;

pub const TOPICS: &[&str] = &[
    "top closers and the closer leaderboard",
    "top setters and the setter leaderboard",
    "comparing closer and setter performance",
    "system sizes (kW)",
    "conversion rates",
    "your stats and your team's stats",
    "self-gen deals",
    "objection handling",
    "follow-ups and appointments",
    "your leads and recent activity",
    "sales tips and motivation",
];

fn freshness(as_of: &DateTime<Utc>) -> String {
    format!("🕒 Data as of {}", as_of.format("%b %d, %H:%M UTC"))
}

pub fn data_unavailable() -> String {
    "📉 Sales data is momentarily unavailable. Please try again in a few minutes.".to_string()
}

pub fn service_unavailable(ctx: &AssistantContext) -> String {
    format!(
        "⚠️ Sorry, I'm having trouble answering right now. Please try again in a moment. \
         Your {} dashboard still shows your latest numbers in the meantime.",
        ctx.role_label()
    )
}

pub fn fallback(ctx: &AssistantContext) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "🤔 I'm not sure how to help with that yet, {}. Try asking me about:",
        ctx.role_label()
    );
    for topic in TOPICS {
        let _ = writeln!(output, "• {topic}");
    }
    output.trim_end().to_string()
}

pub fn greeting(ctx: &AssistantContext) -> String {
    let focus = match ctx.user_role {
        Some(Role::Closer) => "your closing numbers, system sizes and where you sit on the closer leaderboard",
        Some(Role::Setter) => "your conversion rate, your leads and the setter leaderboard",
        Some(Role::Manager) => "team performance, the closer and setter leaderboards and conversion trends",
        None => "leaderboards, conversion rates and sales tips",
    };
    format!(
        "👋 Hi there! I'm your LeadFlow assistant. As a {}, you can ask me about {focus}.",
        ctx.role_label()
    )
}

pub fn thanks(ctx: &AssistantContext) -> String {
    format!(
        "🙌 Anytime! Keep up the great work, {}. Ask me again whenever you need numbers.",
        ctx.role_label()
    )
}

pub fn help(ctx: &AssistantContext) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "💡 Here's what I can help you with as a {}:", ctx.role_label());
    for topic in TOPICS {
        let _ = writeln!(output, "• {topic}");
    }
    let _ = write!(output, "You can also ask \"how is <name> doing?\" for anyone on the leaderboard.");
    output
}

// ---------------------------------------------------------------------------
// Data-driven replies
// ---------------------------------------------------------------------------

fn closer_line(rank: usize, closer: &CloserSummary) -> String {
    format!(
        "{rank}. {}: {:.1} kW across {} deals (avg {:.1} kW)",
        closer.name,
        closer.total_kw,
        closer.total_deals_count,
        closer.avg_kw_per_deal()
    )
}

fn setter_line(rank: usize, setter: &SetterSummary) -> String {
    format!(
        "{rank}. {}: {:.1}% conversion ({} of {} leads sold)",
        setter.name, setter.conversion_rate, setter.sold_leads, setter.total_leads
    )
}

pub fn top_closers(insights: Option<&CloserInsights>) -> String {
    let Some(insights) = insights else {
        return data_unavailable();
    };
    if insights.top_closers.is_empty() {
        return "🏆 No net deals have been recorded yet, so the closer leaderboard is empty.".to_string();
    }

    let mut output = String::new();
    let _ = writeln!(output, "🏆 Top closers by net kW:");
    for (i, closer) in insights.top_closers.iter().take(DISPLAYED_CLOSERS).enumerate() {
        let _ = writeln!(output, "{}", closer_line(i + 1, closer));
    }
    let _ = writeln!(
        output,
        "Team total: {} net deals, {:.1} kW",
        insights.total_deals, insights.total_kw
    );
    let _ = write!(output, "{}", freshness(&insights.data_freshness));
    output
}

pub fn top_setters(insights: Option<&SetterInsights>) -> String {
    let Some(insights) = insights else {
        return data_unavailable();
    };

    let mut output = String::new();
    let _ = writeln!(output, "🎯 Top setters by conversion rate:");
    for (i, setter) in insights.top_setters.iter().take(DISPLAYED_SETTERS).enumerate() {
        let _ = writeln!(output, "{}", setter_line(i + 1, setter));
    }
    let _ = writeln!(
        output,
        "Overall: {} of {} leads sold ({:.1}%)",
        insights.total_sold, insights.total_leads, insights.overall_conversion_rate
    );
    let _ = write!(output, "{}", freshness(&insights.data_freshness));
    output
}

pub fn compare(snapshot: &SheetSnapshot) -> String {
    let (Some(closers), Some(setters)) = (&snapshot.closers, &snapshot.setters) else {
        return data_unavailable();
    };

    let mut output = String::new();
    let _ = writeln!(output, "⚖️ Closer vs setter performance:");
    let _ = writeln!(
        output,
        "Closers: {} net deals totalling {:.1} kW (avg {:.1} kW per deal)",
        closers.total_deals,
        closers.total_kw,
        crate::insights::average(closers.total_kw, closers.total_deals)
    );
    if let Some(best) = closers.top_closers.first() {
        let _ = writeln!(output, "Leading closer: {} with {:.1} kW", best.name, best.total_kw);
    }
    let _ = writeln!(
        output,
        "Setters: {} leads, {} sold ({:.1}% overall conversion)",
        setters.total_leads, setters.total_sold, setters.overall_conversion_rate
    );
    if let Some(best) = setters.top_setters.first() {
        let _ = writeln!(
            output,
            "Leading setter: {} at {:.1}% conversion",
            best.name, best.conversion_rate
        );
    }
    let _ = write!(output, "{}", freshness(&closers.data_freshness));
    output
}

pub fn system_size(insights: Option<&CloserInsights>) -> String {
    let Some(insights) = insights else {
        return data_unavailable();
    };
    if insights.total_deals == 0 {
        return "☀️ No net deals yet, so there are no system sizes to report.".to_string();
    }

    let mut output = String::new();
    let _ = writeln!(
        output,
        "☀️ {:.1} kW sold across {} net deals, averaging {:.1} kW per system.",
        insights.total_kw,
        insights.total_deals,
        crate::insights::average(insights.total_kw, insights.total_deals)
    );
    if let Some(best) = insights
        .top_closers
        .iter()
        .max_by(|a, b| a.avg_kw_per_deal().total_cmp(&b.avg_kw_per_deal()))
    {
        let _ = writeln!(
            output,
            "Largest average system: {} at {:.1} kW per deal.",
            best.name,
            best.avg_kw_per_deal()
        );
    }
    let _ = write!(output, "{}", freshness(&insights.data_freshness));
    output
}

pub fn conversion(ctx: &AssistantContext, insights: Option<&SetterInsights>) -> String {
    let mut output = String::new();
    match insights {
        Some(insights) => {
            let _ = writeln!(
                output,
                "📈 Team conversion is {:.1}% ({} of {} leads sold).",
                insights.overall_conversion_rate, insights.total_sold, insights.total_leads
            );
        }
        None => {
            let _ = writeln!(output, "{}", data_unavailable());
        }
    }
    if let Some(stats) = &ctx.user_stats {
        let _ = writeln!(
            output,
            "Your personal rate is {:.1}% ({} of {} leads).",
            stats.conversion_rate, stats.sold_leads, stats.total_leads
        );
    }
    let _ = write!(
        output,
        "Tip: fast first contact and a confirmed appointment are the biggest conversion levers."
    );
    output
}

pub fn self_gen(snapshot: &SheetSnapshot) -> String {
    let explainer = "A self-gen deal is one where the same rep both set and closed the appointment.";
    if snapshot.is_empty() {
        return format!("🔁 {explainer} {}", data_unavailable());
    }
    format!(
        "🔁 {explainer} The current sheet shows {} self-gen {}.",
        snapshot.self_gen_count,
        if snapshot.self_gen_count == 1 { "deal" } else { "deals" }
    )
}

pub fn closer_spotlight(closer: &CloserSummary, rank: usize, insights: &CloserInsights) -> String {
    let remark = if rank <= 3 {
        "🔥 A top-3 closer right now. Outstanding work!"
    } else {
        "💪 Solid numbers. A couple more net deals moves them up the board."
    };

    let mut output = String::new();
    let _ = writeln!(
        output,
        "📊 {} is ranked #{rank} of {} closers on the leaderboard.",
        closer.name,
        insights.top_closers.len()
    );
    let _ = writeln!(output, "• Net deals: {}", closer.total_deals_count);
    let _ = writeln!(output, "• Total: {:.1} kW", closer.total_kw);
    let _ = writeln!(output, "• Average: {:.1} kW per deal", closer.avg_kw_per_deal());
    let _ = writeln!(output, "{remark}");
    let _ = write!(output, "{}", freshness(&insights.data_freshness));
    output
}

pub fn setter_spotlight(setter: &SetterSummary, rank: usize, insights: &SetterInsights) -> String {
    let remark = if setter.conversion_rate > 50.0 {
        "🔥 Converting more than half of their leads. Excellent!"
    } else {
        "💪 Good volume. Tightening follow-ups will lift that conversion rate."
    };

    let mut output = String::new();
    let _ = writeln!(
        output,
        "📊 {} is ranked #{rank} of {} setters by conversion.",
        setter.name,
        insights.top_setters.len()
    );
    let _ = writeln!(
        output,
        "• Leads: {} total, {} sold",
        setter.total_leads, setter.sold_leads
    );
    let _ = writeln!(output, "• Conversion: {:.1}%", setter.conversion_rate);
    let _ = writeln!(output, "• Average sold system: {:.1} kW", setter.avg_kw_per_sale());
    let _ = writeln!(
        output,
        "• Closers worked with: {}",
        setter.unique_closers_worked_with
    );
    let _ = writeln!(output, "{remark}");
    let _ = write!(output, "{}", freshness(&insights.data_freshness));
    output
}

// ---------------------------------------------------------------------------
// Context-only replies
// ---------------------------------------------------------------------------

pub fn my_stats(ctx: &AssistantContext) -> String {
    match &ctx.user_stats {
        Some(stats) => format!(
            "📋 Your numbers as a {}: {} leads, {} sold, {:.1}% conversion.",
            ctx.role_label(),
            stats.total_leads,
            stats.sold_leads,
            stats.conversion_rate
        ),
        None => format!(
            "📋 I don't have personal stats for you yet, {}. They appear once your first leads are logged.",
            ctx.role_label()
        ),
    }
}

pub fn team_stats(ctx: &AssistantContext) -> String {
    match &ctx.team_stats {
        Some(stats) => format!(
            "👥 Team {}: {} members, {} leads, {} recently sold.",
            if ctx.team_id.is_empty() { "overview" } else { ctx.team_id.as_str() },
            stats.team_size,
            stats.total_leads,
            stats.recent_sold_leads
        ),
        None => "👥 Team stats aren't available yet. Check the team dashboard once leads start coming in."
            .to_string(),
    }
}

pub fn objections(ctx: &AssistantContext) -> String {
    let opener = match ctx.user_role {
        Some(Role::Setter) => "At the door, keep it short and earn the appointment rather than the sale.",
        Some(Role::Closer) => "In the home, slow down and find the real concern before you answer it.",
        _ => "Coach the team to find the real concern before answering it.",
    };
    format!(
        "🛡️ {opener}\n\
         • \"Too expensive\": compare the monthly payment to their current utility bill.\n\
         • \"Not interested\": ask what they pay for power today, curiosity opens doors.\n\
         • \"Need to think about it\": agree on a specific follow-up time before you leave."
    )
}

pub fn follow_up(ctx: &AssistantContext) -> String {
    format!(
        "📞 Follow-up playbook for a {}:\n\
         • Reach new leads within 5 minutes when you can.\n\
         • Try at least 3 touches over 7 days, mixing calls and texts.\n\
         • Log every attempt so the next person has context.",
        ctx.role_label()
    )
}

pub fn appointments(ctx: &AssistantContext) -> String {
    let step = match ctx.user_role {
        Some(Role::Setter) => "Confirm the appointment the day before and make sure both decision makers will be there.",
        Some(Role::Closer) => "Review the lead notes and the utility bill before every appointment.",
        _ => "Keep closer calendars balanced so hot leads get next-day appointments.",
    };
    format!("📅 {step} Offer two specific time slots instead of asking when they're free.")
}

pub fn leads(ctx: &AssistantContext) -> String {
    match ctx.lead_count {
        Some(0) => "📥 You don't have any leads assigned right now. Time to knock some doors!".to_string(),
        Some(count) => format!(
            "📥 You have {count} {} in your pipeline. Work the newest ones first.",
            if count == 1 { "lead" } else { "leads" }
        ),
        None => "📥 I can't see your lead count right now. Open the Leads tab for the full list."
            .to_string(),
    }
}

pub fn recent_activity(ctx: &AssistantContext) -> String {
    match ctx.recent_activity.as_deref().filter(|text| !text.trim().is_empty()) {
        Some(activity) => format!("🗞️ Latest activity: {}", activity.trim()),
        None => "🗞️ No recent activity to report. New updates show up here as leads move.".to_string(),
    }
}

pub fn tips(ctx: &AssistantContext) -> String {
    let body = match ctx.user_role {
        Some(Role::Setter) => {
            "• Knock during the golden hours, 4pm to 7pm.\n\
             • Qualify on roof, shade and bill before booking.\n\
             • Hand the closer detailed notes."
        }
        Some(Role::Closer) => {
            "• Rebuild rapport in the first five minutes.\n\
             • Anchor the proposal to their actual bill.\n\
             • Ask for referrals right after signing."
        }
        Some(Role::Manager) => {
            "• Pair low-conversion setters with your top closers.\n\
             • Review the leaderboard weekly with the team.\n\
             • Celebrate net deals, not only gross leads."
        }
        None => {
            "• Follow up fast.\n\
             • Know the numbers on the leaderboard.\n\
             • Keep notes on every lead."
        }
    };
    format!("💡 Tips for a {}:\n{body}", ctx.role_label())
}

pub fn motivation(ctx: &AssistantContext) -> String {
    format!(
        "🚀 Every top {} on the board has had rough days. One conversation can turn the week around, so keep going!",
        ctx.role_label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::aggregate_closer_insights;
    use crate::models::SourceRow;

    #[test]
    fn greeting_mentions_role() {
        let ctx = AssistantContext::for_role(Role::Closer, "team-1");
        let reply = greeting(&ctx);
        assert!(reply.starts_with("👋 Hi there!"));
        assert!(reply.contains("closer"));
    }

    #[test]
    fn fallback_lists_every_topic() {
        let reply = fallback(&AssistantContext::default());
        for topic in TOPICS {
            assert!(reply.contains(topic));
        }
        assert!(reply.contains("team member"));
    }

    #[test]
    fn missing_insights_use_unavailable_phrasing() {
        assert_eq!(top_closers(None), data_unavailable());
        assert_eq!(top_setters(None), data_unavailable());
        assert_eq!(compare(&SheetSnapshot::default()), data_unavailable());
    }

    #[test]
    fn zero_deals_is_not_unavailable() {
        let rows = vec![SourceRow {
            closer_name: Some("Amy".to_string()),
            setter_name: None,
            system_size_kw: 5.0,
            realization_flag: 0.0,
        }];
        let insights = aggregate_closer_insights(&rows);
        let reply = top_closers(insights.as_ref());
        assert_ne!(reply, data_unavailable());
        assert!(reply.contains("No net deals"));
    }

    #[test]
    fn service_unavailable_interpolates_role() {
        let ctx = AssistantContext::for_role(Role::Setter, "team-1");
        assert!(service_unavailable(&ctx).contains("setter dashboard"));
    }

    #[test]
    fn lead_count_pluralizes() {
        let mut ctx = AssistantContext::for_role(Role::Setter, "team-1");
        ctx.lead_count = Some(1);
        assert!(leads(&ctx).contains("1 lead in"));
        ctx.lead_count = Some(4);
        assert!(leads(&ctx).contains("4 leads in"));
    }
}
