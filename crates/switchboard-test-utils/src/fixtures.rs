use switchboard_core::agent::AgentDescriptor;

const RECEPTION: &str = "reception_agent";

fn agent(name: &str, prompt: &str) -> AgentDescriptor {
    AgentDescriptor::new(name)
        .with_prompt(prompt)
        .with_temperature(0.7)
}

/// The nine-agent office deployment: a reception root with booking, FAQ,
/// emergency, HR, IT, visitor and feedback children, and a scheduler under
/// booking. Rules are declared in routing priority order.
pub fn office_descriptors() -> Vec<AgentDescriptor> {
    vec![
        agent(RECEPTION, "You are an office reception agent. Greet visitors and route them.")
            .root()
            .with_rule("booking", "booking_agent")
            .with_rule("faq", "faq_agent")
            .with_rule("emergency", "emergency_agent")
            .with_rule("hr", "hr_agent")
            .with_rule("it", "it_agent")
            .with_rule("visitor", "visitor_agent")
            .with_rule("feedback", "feedback_agent"),
        agent("booking_agent", "You are a booking agent. Book rooms and appointments.")
            .with_parent(RECEPTION)
            .with_rule("scheduler", "scheduler_agent")
            .with_rule("faq", "faq_agent")
            .with_rule("feedback", "feedback_agent")
            .with_rule("reception", RECEPTION),
        agent("faq_agent", "You are an FAQ agent. Answer common office questions.")
            .with_parent(RECEPTION)
            .with_rule("reception", RECEPTION)
            .with_rule("feedback", "feedback_agent")
            .with_rule("hr", "hr_agent")
            .with_rule("it", "it_agent"),
        agent("emergency_agent", "You are an emergency agent. Handle urgent situations.")
            .with_parent(RECEPTION)
            .with_rule("reception", RECEPTION)
            .with_rule("feedback", "feedback_agent"),
        agent("hr_agent", "You are an HR agent. Handle HR queries.")
            .with_parent(RECEPTION)
            .with_rule("faq", "faq_agent")
            .with_rule("reception", RECEPTION)
            .with_rule("feedback", "feedback_agent"),
        agent("it_agent", "You are an IT support agent. Handle IT issues.")
            .with_parent(RECEPTION)
            .with_rule("faq", "faq_agent")
            .with_rule("reception", RECEPTION)
            .with_rule("feedback", "feedback_agent"),
        agent("visitor_agent", "You are a visitor management agent. Manage check-ins.")
            .with_parent(RECEPTION)
            .with_rule("booking", "booking_agent")
            .with_rule("reception", RECEPTION)
            .with_rule("feedback", "feedback_agent"),
        agent("scheduler_agent", "You are a scheduler agent. Manage the office calendar.")
            .with_parent("booking_agent")
            .with_rule("reception", RECEPTION)
            .with_rule("feedback", "feedback_agent"),
        agent("feedback_agent", "You are a feedback agent. Collect user feedback.")
            .with_parent(RECEPTION)
            .with_rule("reception", RECEPTION),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_office_shape() {
        let agents = office_descriptors();
        assert_eq!(agents.len(), 9);
        assert_eq!(agents.iter().filter(|a| a.is_root).count(), 1);
        let scheduler = agents.iter().find(|a| a.name == "scheduler_agent").unwrap();
        assert_eq!(scheduler.parent.as_deref(), Some("booking_agent"));
    }
}
