//! Add-on history export
//!
//! Exports an organization's add-on event log to CSV for:
//! - customer billing statements
//! - reconciliation against the persisted active set

use crate::state::AddonState;

/// Export the add-on history to CSV, oldest event first.
///
/// Columns: Date, Action, Addons, Monthly Delta (EUR).
pub fn export_history_csv(state: &AddonState) -> String {
    let mut csv = String::new();
    csv.push_str("Date,Action,Addons,Monthly Delta (EUR)\n");

    for event in &state.history {
        let date = event
            .timestamp
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());
        let delta_eur = event.monthly_cost_delta_cents as f64 / 100.0;
        let addons = escape_csv_field(&event.addon_ids.join(" "));

        csv.push_str(&format!(
            "{},{},{},{:.2}\n",
            date, event.action, addons, delta_eur
        ));
    }

    csv
}

/// Escape a field for CSV output
fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
