use crate::model::{Regulation, TradingSystem};

/// Requirement statements for one impacted system.
///
/// The class-specific line is only emitted when at least one class is
/// impacted.
pub fn requirements_for_system(
    system: &TradingSystem,
    regulation: &Regulation,
    impacted_classes: &[String],
    change_description: &str,
) -> Vec<String> {
    let mut out = vec![format!(
        "Update {} to handle {} ({})",
        system.name, change_description, regulation.name
    )];
    if let Some(first) = impacted_classes.first() {
        out.push(format!(
            "Modify {first} to implement new validation rules"
        ));
    }
    out.push(format!(
        "Add logging for compliance tracking in affected {} components",
        system.name
    ));
    out
}

/// Ticket description for a regulatory change.
pub fn ticket_description(change_description: &str) -> String {
    format!("Regulatory Impact: {change_description}")
}

/// Short summary of the impacted classes sent along with a ticket.
pub fn impact_summary(impacted_classes: &[String]) -> String {
    if impacted_classes.is_empty() {
        "Impacted Classes: none identified".to_string()
    } else {
        format!("Impacted Classes: {}", impacted_classes.join(", "))
    }
}
