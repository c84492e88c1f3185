//! Billing calculator
//!
//! Derives invoice line items, totals and prorated deltas from a plan, an
//! add-on state and a billing window. Everything here is pure except
//! [`generate_invoice_number`] and the `current_*` period helpers, which read
//! the clock.
//!
//! Two billing conventions are deliberate and must survive refactors:
//! - the daily rate is the monthly total divided by a fixed 30-day month,
//!   whatever the calendar says; switching to calendar-accurate days is a
//!   product decision, not a cleanup;
//! - billing periods are calendar-month aligned for every organization,
//!   regardless of signup date.

use serde::Serialize;
use time::macros::format_description;
use time::{Date, Duration, Month, OffsetDateTime};
use uuid::Uuid;

use glowdesk_shared::Plan;

use crate::catalog;
use crate::state::AddonState;

/// French VAT applied to subscription invoices, in percent
pub const VAT_RATE_PERCENT: i64 = 20;

/// Fixed month length used for daily-rate proration
const PRORATA_MONTH_DAYS: i64 = 30;

/// What a line item bills for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    Plan,
    Addon,
    ProrataCredit,
    ProrataCharge,
}

/// One line of an invoice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub kind: LineItemKind,
    pub description: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub total_cents: i64,
}

/// Kind of mid-cycle change an invoice accounts for. Supplied by the caller's
/// business logic, never inferred here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    PlanUpgrade,
    PlanDowngrade,
    AddonsChanged,
}

/// Prorated delta for a mid-cycle configuration change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Prorata {
    /// Whole days from the change to the period end, rounded up, floored at 0
    pub days_remaining: i64,
    /// Unused value of the old configuration, in cents (>= 0)
    pub credit_cents: i64,
    /// Cost of the new configuration for the rest of the period, in cents (>= 0)
    pub charge_cents: i64,
    /// `charge - credit`; negative on downgrades
    pub net_cents: i64,
}

/// A calendar-month billing window. `end` is exclusive (first instant of the
/// next period).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BillingPeriod {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
}

/// Mid-cycle change context for [`invoice_metadata`]
#[derive(Debug, Clone, Copy)]
pub struct PlanChange<'a> {
    pub change_type: ChangeType,
    pub previous_plan: Plan,
    pub previous_addons: Option<&'a AddonState>,
    pub change_date: OffsetDateTime,
}

/// Immutable invoice snapshot handed to the rendering collaborator
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceMetadata {
    pub plan: Plan,
    /// Active recurring add-on ids, in activation order
    pub addon_ids: Vec<String>,
    pub line_items: Vec<LineItem>,
    #[serde(with = "time::serde::rfc3339")]
    pub period_start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub period_end: OffsetDateTime,
    pub change_type: Option<ChangeType>,
    pub prorata: Option<Prorata>,
    /// Net total of all line items
    pub total_ht_cents: i64,
    pub vat_rate_percent: i64,
    pub total_tva_cents: i64,
    /// Gross total (net + VAT)
    pub total_ttc_cents: i64,
}

/// Recurring invoice total: plan price plus active recurring add-ons
pub fn invoice_total_cents(plan: Plan, addons: Option<&AddonState>) -> i64 {
    match addons {
        Some(state) => crate::lifecycle::monthly_total(plan, state),
        None => plan.price_cents(),
    }
}

/// Base line items for a billing window: the plan line first, then one line
/// per active recurring add-on in activation order. The order is fixed so an
/// invoice can be reconstructed byte-for-byte from the same inputs.
pub fn invoice_line_items(
    plan: Plan,
    addons: Option<&AddonState>,
    period_start: OffsetDateTime,
    period_end: OffsetDateTime,
) -> Vec<LineItem> {
    let mut items = vec![LineItem {
        kind: LineItemKind::Plan,
        description: format!(
            "GlowDesk subscription - {} plan ({} to {})",
            plan.display_name(),
            fmt_date(period_start),
            fmt_date(period_end),
        ),
        quantity: 1,
        unit_price_cents: plan.price_cents(),
        total_cents: plan.price_cents(),
    }];

    if let Some(state) = addons {
        for addon in state.recurring.iter().filter_map(|id| catalog::addon(id)) {
            items.push(LineItem {
                kind: LineItemKind::Addon,
                description: format!("Add-on: {}", addon.name),
                quantity: 1,
                unit_price_cents: addon.price_cents,
                total_cents: addon.price_cents,
            });
        }
    }

    items
}

/// Prorated credit/charge for a configuration change at `change_date` within
/// a period ending at `period_end`.
///
/// Credit refunds the unused share of the old configuration, the charge bills
/// the new configuration for the same remaining days. Both use the fixed
/// 30-day month; the single division rounds half up so cents stay exact.
pub fn prorata(
    old_plan: Plan,
    new_plan: Plan,
    old_addons: Option<&AddonState>,
    new_addons: Option<&AddonState>,
    change_date: OffsetDateTime,
    period_end: OffsetDateTime,
) -> Prorata {
    let days_remaining = days_until(change_date, period_end);
    let credit_cents = prorated_cents(invoice_total_cents(old_plan, old_addons), days_remaining);
    let charge_cents = prorated_cents(invoice_total_cents(new_plan, new_addons), days_remaining);
    Prorata {
        days_remaining,
        credit_cents,
        charge_cents,
        net_cents: charge_cents - credit_cents,
    }
}

/// Compose the full invoice snapshot for a billing window, with prorated
/// credit/charge lines appended when a mid-cycle change is supplied.
pub fn invoice_metadata(
    plan: Plan,
    addons: Option<&AddonState>,
    period_start: OffsetDateTime,
    period_end: OffsetDateTime,
    change: Option<PlanChange<'_>>,
) -> InvoiceMetadata {
    let mut line_items = invoice_line_items(plan, addons, period_start, period_end);

    let (change_type, prorata_block) = match change {
        Some(ctx) => {
            let block = prorata(
                ctx.previous_plan,
                plan,
                ctx.previous_addons,
                addons,
                ctx.change_date,
                period_end,
            );
            if block.credit_cents > 0 {
                line_items.push(LineItem {
                    kind: LineItemKind::ProrataCredit,
                    description: format!(
                        "Prorated credit - {} plan ({} days unused)",
                        ctx.previous_plan.display_name(),
                        block.days_remaining,
                    ),
                    quantity: 1,
                    unit_price_cents: -block.credit_cents,
                    total_cents: -block.credit_cents,
                });
            }
            if block.charge_cents > 0 {
                line_items.push(LineItem {
                    kind: LineItemKind::ProrataCharge,
                    description: format!(
                        "Prorated charge - {} plan ({} days)",
                        plan.display_name(),
                        block.days_remaining,
                    ),
                    quantity: 1,
                    unit_price_cents: block.charge_cents,
                    total_cents: block.charge_cents,
                });
            }
            (Some(ctx.change_type), Some(block))
        }
        None => (None, None),
    };

    let total_ht_cents: i64 = line_items.iter().map(|item| item.total_cents).sum();
    let total_tva_cents = vat_cents(total_ht_cents);

    InvoiceMetadata {
        plan,
        addon_ids: addons.map(|s| s.recurring.clone()).unwrap_or_default(),
        line_items,
        period_start,
        period_end,
        change_type,
        prorata: prorata_block,
        total_ht_cents,
        vat_rate_percent: VAT_RATE_PERCENT,
        total_tva_cents,
        total_ttc_cents: total_ht_cents + total_tva_cents,
    }
}

/// Generate an invoice number: `GD-<year><month>-<timestamp tail><random>`.
///
/// Collisions are improbable, not impossible; the persistence layer's unique
/// constraint on the invoice number column is the real guarantee.
pub fn generate_invoice_number() -> String {
    let now = OffsetDateTime::now_utc();
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let tail = millis % 1_000_000;
    let rand = Uuid::new_v4().simple().to_string();
    format!(
        "GD-{}{:02}-{:06}-{}",
        now.year(),
        u8::from(now.month()),
        tail,
        &rand[..4],
    )
}

/// The calendar-month billing window containing `date`. All organizations
/// share the same monthly boundaries regardless of signup date.
pub fn billing_period_for(date: OffsetDateTime) -> BillingPeriod {
    let first = date.date().replace_day(1).unwrap_or(date.date());
    let next_first = first_of_next_month(first);
    BillingPeriod {
        start: first.midnight().assume_utc(),
        end: next_first.midnight().assume_utc(),
    }
}

/// The billing window containing the current instant
pub fn current_billing_period() -> BillingPeriod {
    billing_period_for(OffsetDateTime::now_utc())
}

/// First instant of the next billing window
pub fn next_billing_date() -> OffsetDateTime {
    current_billing_period().end
}

/// Payment due date: seven days after issue
pub fn due_date(issue_date: OffsetDateTime) -> OffsetDateTime {
    issue_date + Duration::days(7)
}

fn first_of_next_month(first: Date) -> Date {
    let (year, month) = match first.month() {
        Month::December => (first.year() + 1, Month::January),
        other => (first.year(), other.next()),
    };
    Date::from_calendar_date(year, month, 1).unwrap_or(first)
}

/// Whole days from `from` to `to`, rounded up, floored at 0
fn days_until(from: OffsetDateTime, to: OffsetDateTime) -> i64 {
    let seconds = (to - from).whole_seconds();
    if seconds <= 0 {
        0
    } else {
        (seconds + 86_399) / 86_400
    }
}

/// `monthly * days / 30`, rounded half up
fn prorated_cents(monthly_cents: i64, days: i64) -> i64 {
    (monthly_cents * days + PRORATA_MONTH_DAYS / 2) / PRORATA_MONTH_DAYS
}

fn vat_cents(net_cents: i64) -> i64 {
    (net_cents * VAT_RATE_PERCENT + 50) / 100
}

fn fmt_date(date: OffsetDateTime) -> String {
    let format = format_description!("[day]/[month]/[year]");
    date.format(&format).unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn state_with(recurring: &[&str]) -> AddonState {
        AddonState {
            recurring: recurring.iter().map(|s| s.to_string()).collect(),
            ..AddonState::default()
        }
    }

    #[test]
    fn test_invoice_total_matches_plan_plus_addons() {
        let state = state_with(&["feature-stock"]);
        assert_eq!(invoice_total_cents(Plan::Team, Some(&state)), 17_400);
        assert_eq!(invoice_total_cents(Plan::Team, None), 14_900);
    }

    #[test]
    fn test_team_with_stock_addon_yields_two_line_items() {
        let state = state_with(&["feature-stock"]);
        let start = datetime!(2025-03-01 00:00:00 UTC);
        let end = datetime!(2025-04-01 00:00:00 UTC);

        let items = invoice_line_items(Plan::Team, Some(&state), start, end);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, LineItemKind::Plan);
        assert_eq!(items[0].total_cents, 14_900);
        assert!(items[0].description.contains("01/03/2025"));
        assert_eq!(items[1].kind, LineItemKind::Addon);
        assert_eq!(items[1].total_cents, 2_500);

        let total: i64 = items.iter().map(|i| i.total_cents).sum();
        assert_eq!(total, 17_400);
    }

    #[test]
    fn test_line_items_keep_activation_order() {
        let state = state_with(&["feature-stock", "feature-crm", "feature-shop"]);
        let start = datetime!(2025-03-01 00:00:00 UTC);
        let end = datetime!(2025-04-01 00:00:00 UTC);

        let first = invoice_line_items(Plan::Solo, Some(&state), start, end);
        let second = invoice_line_items(Plan::Solo, Some(&state), start, end);
        assert_eq!(first, second);

        let descriptions: Vec<&str> = first[1..].iter().map(|i| i.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec!["Add-on: Advanced Stock", "Add-on: CRM & Prospecting", "Add-on: Online Shop"]
        );
    }

    #[test]
    fn test_prorata_mid_period_upgrade() {
        // 15 of 30 days remaining, SOLO -> DUO
        let change = datetime!(2025-03-17 00:00:00 UTC);
        let end = datetime!(2025-04-01 00:00:00 UTC);
        let p = prorata(Plan::Solo, Plan::Duo, None, None, change, end);

        assert_eq!(p.days_remaining, 15);
        assert_eq!(p.credit_cents, 2_450); // 49.00 / 30 * 15
        assert_eq!(p.charge_cents, 4_450); // 89.00 / 30 * 15
        assert_eq!(p.net_cents, 2_000);
    }

    #[test]
    fn test_prorata_downgrade_is_negative() {
        let change = datetime!(2025-03-17 00:00:00 UTC);
        let end = datetime!(2025-04-01 00:00:00 UTC);
        let p = prorata(Plan::Duo, Plan::Solo, None, None, change, end);
        assert_eq!(p.net_cents, -2_000);
    }

    #[test]
    fn test_prorata_days_are_rounded_up_and_floored_at_zero() {
        let end = datetime!(2025-04-01 00:00:00 UTC);

        // 30 minutes before the boundary still counts as one day
        let p = prorata(Plan::Solo, Plan::Duo, None, None, end - Duration::minutes(30), end);
        assert_eq!(p.days_remaining, 1);

        // a change recorded after the period end prorates nothing
        let p = prorata(Plan::Solo, Plan::Duo, None, None, end + Duration::hours(1), end);
        assert_eq!(p.days_remaining, 0);
        assert_eq!(p.credit_cents, 0);
        assert_eq!(p.charge_cents, 0);
        assert_eq!(p.net_cents, 0);
    }

    #[test]
    fn test_prorata_counts_addons_in_both_configurations() {
        let change = datetime!(2025-03-17 00:00:00 UTC);
        let end = datetime!(2025-04-01 00:00:00 UTC);
        let old_state = state_with(&["feature-shop"]);

        let p = prorata(Plan::Duo, Plan::Team, Some(&old_state), None, change, end);
        // old: 89 + 25 = 114.00 -> 57.00 for 15 days
        assert_eq!(p.credit_cents, 5_700);
        // new: 149.00 -> 74.50 for 15 days
        assert_eq!(p.charge_cents, 7_450);
    }

    #[test]
    fn test_invoice_metadata_without_change() {
        let state = state_with(&["feature-stock"]);
        let start = datetime!(2025-03-01 00:00:00 UTC);
        let end = datetime!(2025-04-01 00:00:00 UTC);

        let invoice = invoice_metadata(Plan::Team, Some(&state), start, end, None);
        assert_eq!(invoice.line_items.len(), 2);
        assert_eq!(invoice.total_ht_cents, 17_400);
        assert_eq!(invoice.total_tva_cents, 3_480);
        assert_eq!(invoice.total_ttc_cents, 20_880);
        assert!(invoice.prorata.is_none());
        assert!(invoice.change_type.is_none());
        assert_eq!(invoice.addon_ids, vec!["feature-stock"]);
    }

    #[test]
    fn test_invoice_metadata_with_upgrade_appends_prorata_lines() {
        let start = datetime!(2025-03-01 00:00:00 UTC);
        let end = datetime!(2025-04-01 00:00:00 UTC);
        let change = PlanChange {
            change_type: ChangeType::PlanUpgrade,
            previous_plan: Plan::Solo,
            previous_addons: None,
            change_date: datetime!(2025-03-17 00:00:00 UTC),
        };

        let invoice = invoice_metadata(Plan::Duo, None, start, end, Some(change));
        assert_eq!(invoice.change_type, Some(ChangeType::PlanUpgrade));

        let credit = &invoice.line_items[1];
        assert_eq!(credit.kind, LineItemKind::ProrataCredit);
        assert_eq!(credit.total_cents, -2_450);

        let charge = &invoice.line_items[2];
        assert_eq!(charge.kind, LineItemKind::ProrataCharge);
        assert_eq!(charge.total_cents, 4_450);

        // 8900 - 2450 + 4450
        assert_eq!(invoice.total_ht_cents, 10_900);
    }

    #[test]
    fn test_billing_period_is_calendar_month_aligned() {
        let period = billing_period_for(datetime!(2025-03-17 15:42:05 UTC));
        assert_eq!(period.start, datetime!(2025-03-01 00:00:00 UTC));
        assert_eq!(period.end, datetime!(2025-04-01 00:00:00 UTC));
    }

    #[test]
    fn test_billing_period_wraps_december() {
        let period = billing_period_for(datetime!(2025-12-31 23:59:59 UTC));
        assert_eq!(period.start, datetime!(2025-12-01 00:00:00 UTC));
        assert_eq!(period.end, datetime!(2026-01-01 00:00:00 UTC));
    }

    #[test]
    fn test_due_date_is_seven_days_out() {
        let issued = datetime!(2025-03-01 09:00:00 UTC);
        assert_eq!(due_date(issued), datetime!(2025-03-08 09:00:00 UTC));
    }

    #[test]
    fn test_invoice_number_shape() {
        let number = generate_invoice_number();
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "GD");
        assert_eq!(parts[1].len(), 6); // YYYYMM
        assert_eq!(parts[2].len(), 6); // timestamp tail
        assert_eq!(parts[3].len(), 4); // random suffix

        // two numbers generated back to back differ
        assert_ne!(generate_invoice_number(), number);
    }
}
