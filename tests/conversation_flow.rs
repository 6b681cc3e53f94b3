use std::sync::Arc;

use futures::StreamExt;

use switchboard_core::config::RoutingConfig;
use switchboard_core::types::{Role, TransitionKind};
use switchboard_graph::{AgentRoster, ConversationGraph, SessionManager};
use switchboard_test_utils::{office_descriptors, ScriptedHandlers};

fn office(handlers: &ScriptedHandlers) -> AgentRoster {
    AgentRoster::build(office_descriptors(), handlers.factory()).expect("office roster")
}

#[tokio::test]
async fn test_booking_then_scheduler_handoff() {
    let handlers = ScriptedHandlers::new();
    handlers.get("reception_agent").push_reply("Sure.");
    handlers.get("booking_agent").push_reply("Let me check availability.");
    handlers
        .get("booking_agent")
        .push_reply("I'll pass this to the calendar. TRANSITION_TO:scheduler_agent");
    handlers.get("scheduler_agent").push_reply("Booked for Friday at 3pm.");

    let roster = office(&handlers);
    let mut graph = ConversationGraph::create(&roster, RoutingConfig::default());

    let first = graph.respond("I need to book a meeting room").await;
    assert!(first.starts_with("Sure."));
    assert!(first.ends_with("Let me check availability."));
    assert_eq!(graph.get_current_agent(), "booking_agent");

    let second: Vec<String> = graph.process_message("Friday at 3pm please").collect().await;
    let second = second.concat();
    assert!(second.contains("[Transitioning to scheduler_agent]"));
    assert!(second.ends_with("Booked for Friday at 3pm."));
    assert_eq!(
        graph.get_agent_path(),
        ["reception_agent", "booking_agent", "scheduler_agent"]
    );

    let kinds: Vec<TransitionKind> = graph.get_transitions().iter().map(|t| t.kind).collect();
    assert_eq!(kinds, [TransitionKind::RuleMatch, TransitionKind::Explicit]);

    // The scheduler is briefed with a fresh exchange carrying the pending request.
    let briefs = handlers.get("scheduler_agent").received();
    assert_eq!(briefs.len(), 1);
    let brief = &briefs[0];
    assert_eq!(brief.len(), 2);
    assert_eq!(brief[0].role, Role::System);
    assert!(brief[0].content.starts_with("You are scheduler_agent."));
    assert!(brief[0].content.contains("TRANSITION_TO:reception_agent"));
    assert!(brief[0].content.contains("TRANSITION_TO:feedback_agent"));
    assert!(brief[0].content.contains("Pending scheduling request: "));
    assert!(brief[0].content.contains(r#""requested_by":"booking_agent""#));
    assert_eq!(brief[1].content, "[TRANSFERRED REQUEST] Friday at 3pm please");
}

#[tokio::test]
async fn test_completion_hands_on_to_feedback() {
    let handlers = ScriptedHandlers::new();
    handlers.get("reception_agent").push_reply("Sure.");
    handlers.get("booking_agent").push_reply("Which day?");
    handlers
        .get("booking_agent")
        .push_reply("Let me get our FAQ desk. TRANSITION_TO:faq_agent");
    handlers
        .get("faq_agent")
        .push_reply("We open at 9. TRANSITION_TO:feedback_agent");
    handlers.get("feedback_agent").push_reply("How did we do today?");

    let roster = office(&handlers);
    let mut graph = ConversationGraph::create(&roster, RoutingConfig::default());

    graph.respond("I need to book a meeting room").await;
    let text = graph.respond("Also, when do you open?").await;

    assert!(text.contains("[Transitioning to faq_agent]"));
    assert!(text.contains("[Transitioning to feedback_agent]"));
    assert!(text.ends_with("How did we do today?"));
    assert_eq!(graph.get_current_agent(), "feedback_agent");

    let last = graph.get_last_transition().expect("completion recorded");
    assert_eq!(last.kind, TransitionKind::Completion);
    assert_eq!(last.from_agent, "faq_agent");
    assert_eq!(last.to_agent, "feedback_agent");

    let briefs = handlers.get("feedback_agent").received();
    assert_eq!(
        briefs[0][1].content,
        "[TRANSFERRED REQUEST] [TASK COMPLETED by faq_agent] Also, when do you open?"
    );
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let handlers = ScriptedHandlers::new();
    handlers.get("reception_agent").push_reply("Sure.");
    handlers.get("reception_agent").push_reply("Good morning!");

    let sessions = SessionManager::new(Arc::new(office(&handlers)), RoutingConfig::default());

    let alice = sessions.get_or_create("alice").await;
    let bob = sessions.get_or_create("bob").await;

    alice.lock().await.respond("I need to book a meeting room").await;
    bob.lock().await.respond("Good morning").await;

    assert_eq!(alice.lock().await.get_current_agent(), "booking_agent");
    assert_eq!(bob.lock().await.get_current_agent(), "reception_agent");
    assert!(bob.lock().await.get_transitions().is_empty());
    assert_eq!(sessions.len().await, 2);
}
