//! Ordered keyword table for the chat assistant.
//!
//! Routes are checked top to bottom and the first one with any keyword
//! contained in the lowercased message answers. Table order is behaviour:
//! moving an entry changes which reply a mixed message gets.

use tracing::debug;

use crate::insights::SnapshotCell;
use crate::models::{AssistantContext, SheetSnapshot};
use crate::responses;
use crate::source::RowSource;

pub type TextHandler = fn(&AssistantContext) -> anyhow::Result<String>;
pub type InsightsHandler = fn(&AssistantContext, &SheetSnapshot) -> anyhow::Result<String>;

/// Template-only replies versus replies that need sheet data.
#[derive(Clone, Copy)]
pub enum Handler {
    Text(TextHandler),
    Insights(InsightsHandler),
}

#[derive(Clone)]
pub struct Route {
    pub topic: &'static str,
    pub keywords: &'static [&'static str],
    pub handler: Handler,
}

impl Route {
    pub fn matches(&self, lowered_message: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| lowered_message.contains(keyword))
    }
}

pub struct Router {
    routes: Vec<Route>,
}

impl Default for Router {
    fn default() -> Self {
        Self::standard()
    }
}

impl Router {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn standard() -> Self {
        Self::new(standard_routes())
    }

    pub fn find(&self, message: &str) -> Option<&Route> {
        let lowered = message.to_lowercase();
        self.routes.iter().find(|route| route.matches(&lowered))
    }

    /// Handler errors are returned as-is; the assistant owns the fallback.
    pub async fn route<S: RowSource>(
        &self,
        message: &str,
        ctx: &AssistantContext,
        data: &SnapshotCell<'_, S>,
    ) -> anyhow::Result<String> {
        let Some(route) = self.find(message) else {
            debug!("no route matched");
            return Ok(responses::fallback(ctx));
        };
        debug!(topic = route.topic, "route matched");

        match route.handler {
            Handler::Text(handler) => handler(ctx),
            Handler::Insights(handler) => handler(ctx, data.get().await),
        }
    }
}

fn standard_routes() -> Vec<Route> {
    vec![
        Route {
            topic: "top closers",
            keywords: &["top closer", "best closer", "closer leaderboard", "closer ranking", "closers leaderboard", "who is closing"],
            handler: Handler::Insights(|_, snapshot| Ok(responses::top_closers(snapshot.closers.as_ref()))),
        },
        Route {
            topic: "top setters",
            keywords: &["top setter", "best setter", "setter leaderboard", "setter ranking"],
            handler: Handler::Insights(|_, snapshot| Ok(responses::top_setters(snapshot.setters.as_ref()))),
        },
        Route {
            topic: "compare",
            keywords: &["compare", "comparison", "versus", " vs ", "team performance"],
            handler: Handler::Insights(|_, snapshot| Ok(responses::compare(snapshot))),
        },
        Route {
            topic: "system size",
            keywords: &["kw", "kilowatt", "system size"],
            handler: Handler::Insights(|_, snapshot| Ok(responses::system_size(snapshot.closers.as_ref()))),
        },
        Route {
            topic: "conversion",
            keywords: &["conversion", "close rate", "closing rate", "convert"],
            handler: Handler::Insights(|ctx, snapshot| Ok(responses::conversion(ctx, snapshot.setters.as_ref()))),
        },
        Route {
            topic: "my stats",
            keywords: &["my stats", "my performance", "my numbers", "how am i doing"],
            handler: Handler::Text(|ctx| Ok(responses::my_stats(ctx))),
        },
        Route {
            topic: "team stats",
            keywords: &["team stats", "my team", "team size"],
            handler: Handler::Text(|ctx| Ok(responses::team_stats(ctx))),
        },
        Route {
            topic: "self-gen",
            keywords: &["self-gen", "self gen", "selfgen"],
            handler: Handler::Insights(|_, snapshot| Ok(responses::self_gen(snapshot))),
        },
        Route {
            topic: "objections",
            keywords: &["objection", "pushback", "not interested", "too expensive"],
            handler: Handler::Text(|ctx| Ok(responses::objections(ctx))),
        },
        Route {
            topic: "follow-up",
            keywords: &["follow up", "follow-up", "callback", "call back"],
            handler: Handler::Text(|ctx| Ok(responses::follow_up(ctx))),
        },
        Route {
            topic: "appointments",
            keywords: &["appointment", "schedule", "calendar", "booking"],
            handler: Handler::Text(|ctx| Ok(responses::appointments(ctx))),
        },
        Route {
            topic: "leads",
            keywords: &["my leads", "lead count", "how many leads", "pipeline"],
            handler: Handler::Text(|ctx| Ok(responses::leads(ctx))),
        },
        Route {
            topic: "recent activity",
            keywords: &["recent activity", "what's new", "latest", "update"],
            handler: Handler::Text(|ctx| Ok(responses::recent_activity(ctx))),
        },
        Route {
            topic: "tips",
            keywords: &["tip", "improve", "advice", "better"],
            handler: Handler::Text(|ctx| Ok(responses::tips(ctx))),
        },
        Route {
            topic: "motivation",
            keywords: &["motivat", "tired", "discouraged", "rough day", "burnout"],
            handler: Handler::Text(|ctx| Ok(responses::motivation(ctx))),
        },
        Route {
            topic: "greeting",
            keywords: &["hello", "hey", "hi", "good morning", "good afternoon"],
            handler: Handler::Text(|ctx| Ok(responses::greeting(ctx))),
        },
        Route {
            topic: "thanks",
            keywords: &["thank", "thx", "appreciate"],
            handler: Handler::Text(|ctx| Ok(responses::thanks(ctx))),
        },
        Route {
            topic: "help",
            keywords: &["help", "what can you do", "commands"],
            handler: Handler::Text(|ctx| Ok(responses::help(ctx))),
        },
    ]
}
