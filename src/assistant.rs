use tracing::{debug, instrument, warn};

use crate::insights::SnapshotCell;
use crate::lookup;
use crate::models::AssistantInput;
use crate::responses;
use crate::router::Router;
use crate::source::RowSource;

/// Rule-based sales assistant. Every call re-reads the sheet; nothing is
/// kept between requests.
pub struct Assistant<S> {
    source: S,
    router: Router,
}

impl<S: RowSource> Assistant<S> {
    pub fn new(source: S) -> Self {
        Self::with_router(source, Router::standard())
    }

    pub fn with_router(source: S, router: Router) -> Self {
        Self { source, router }
    }

    #[cfg(test)]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Always produces a reply. Any `Err` becomes a role-aware apology; a
    /// panicking handler is not caught and unwinds through this call.
    #[instrument(skip_all, fields(role = input.context.role_label()))]
    pub async fn answer(&self, input: &AssistantInput) -> String {
        match self.try_answer(input).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "assistant handler failed");
                responses::service_unavailable(&input.context)
            }
        }
    }

    async fn try_answer(&self, input: &AssistantInput) -> anyhow::Result<String> {
        debug!(
            history = input.conversation_history.len(),
            "answering chat message"
        );
        let data = SnapshotCell::new(&self.source);
        let snapshot = data.get().await;

        let spotlight = lookup::lookup_closer_mention(&input.message, snapshot.closers.as_ref())
            .or_else(|| lookup::lookup_setter_mention(&input.message, snapshot.setters.as_ref()));
        if let Some(reply) = spotlight {
            debug!("answered from name lookup");
            return Ok(reply);
        }

        self.router
            .route(&input.message, &input.context, &data)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssistantContext, Role};
    use crate::router::{Handler, Route};
    use crate::testing::{CountingSource, UnavailableSource, SALES_SHEET};

    fn input(message: &str, role: Option<Role>) -> AssistantInput {
        AssistantInput {
            message: message.to_string(),
            context: AssistantContext {
                user_role: role,
                team_id: "team-1".to_string(),
                ..AssistantContext::default()
            },
            conversation_history: Vec::new(),
        }
    }

    #[tokio::test]
    async fn name_lookup_short_circuits_keywords() {
        let assistant = Assistant::new(CountingSource::new(SALES_SHEET));
        let reply = assistant
            .answer(&input("hello! how is Amy doing?", Some(Role::Manager)))
            .await;
        assert!(reply.contains("Amy Smith is ranked #1"));
        assert!(!reply.contains("👋"));
    }

    #[tokio::test]
    async fn setter_lookup_runs_after_closer_lookup() {
        let assistant = Assistant::new(CountingSource::new(SALES_SHEET));
        let reply = assistant
            .answer(&input("how is dana doing", Some(Role::Manager)))
            .await;
        assert!(reply.contains("Dana Fox is ranked #2"));
    }

    #[tokio::test]
    async fn greeting_names_the_role() {
        let assistant = Assistant::new(CountingSource::new(SALES_SHEET));
        let reply = assistant.answer(&input("hi there", Some(Role::Closer))).await;
        assert!(reply.contains("👋 Hi there!"));
        assert!(reply.contains("closer"));
    }

    #[tokio::test]
    async fn one_fetch_per_request() {
        let assistant = Assistant::new(CountingSource::new(SALES_SHEET));
        let reply = assistant
            .answer(&input("compare closers and setters", Some(Role::Manager)))
            .await;
        assert!(reply.contains("4 net deals totalling 24.0 kW"));
        assert!(reply.contains("7 leads, 4 sold (57.1% overall conversion)"));
        assert_eq!(assistant.source().fetches(), 1);
    }

    #[tokio::test]
    async fn unavailable_sheet_degrades_to_phrasing() {
        let assistant = Assistant::new(UnavailableSource);
        let reply = assistant
            .answer(&input("who are the top closers?", Some(Role::Closer)))
            .await;
        assert_eq!(reply, responses::data_unavailable());
    }

    #[tokio::test]
    async fn self_gen_counts_from_sheet() {
        let assistant = Assistant::new(CountingSource::new(SALES_SHEET));
        let reply = assistant
            .answer(&input("what is a self-gen?", Some(Role::Setter)))
            .await;
        assert!(reply.contains("1 self-gen deal."));
    }

    #[tokio::test]
    async fn odd_inputs_still_get_a_reply() {
        let assistant = Assistant::new(UnavailableSource);
        for message in ["", "   ", "🤷", "zzz"] {
            let reply = assistant.answer(&input(message, None)).await;
            assert!(!reply.trim().is_empty());
            assert!(reply.contains("team member"));
        }
    }

    #[tokio::test]
    async fn failing_handler_becomes_apology() {
        let router = Router::new(vec![Route {
            topic: "broken",
            keywords: &["report"],
            handler: Handler::Insights(|_, _| anyhow::bail!("unexpected sheet shape")),
        }]);
        let assistant = Assistant::with_router(CountingSource::new(SALES_SHEET), router);

        let reply = assistant
            .answer(&input("send me the report", Some(Role::Setter)))
            .await;
        assert!(reply.contains("having trouble"));
        assert!(reply.contains("setter"));
    }

    #[tokio::test]
    #[should_panic(expected = "handler bug")]
    async fn panicking_handler_is_not_converted() {
        let router = Router::new(vec![Route {
            topic: "broken",
            keywords: &["report"],
            handler: Handler::Text(|_| panic!("handler bug")),
        }]);
        let assistant = Assistant::with_router(CountingSource::new(SALES_SHEET), router);

        assistant
            .answer(&input("send me the report", Some(Role::Setter)))
            .await;
    }
}
