//! Command execution against the relay
//!
//! One call per user action: the classified intent is approved through
//! the confirmation gate, then executed with a per-intent fallback
//! cascade. Tiers run strictly in sequence, each fully awaited, and the
//! first usable success wins. Every terminal failure produces both a
//! notification and an assistant-role message so the conversation stays
//! coherent.

use crate::core::error::AssistantError;
use crate::core::types::{ChatHistory, Role};
use crate::exec::cascade::{CascadeDiary, TierOutcome};
use crate::exec::gate::{ConfirmGate, NoticeKind, Notifier};
use crate::intent::Intent;
use crate::relay::client::RelayTransport;
use crate::relay::protocol::{is_capability_absent, EmployeeQuery, RelayReply, RpcPayload};
use crate::relay::socket::RelaySocket;
use crate::series::aggregate::{aggregate_series, SeriesOutcome};
use crate::summary::enhancer::{summarize, SummaryClient};
use crate::summary::formatter::format_records;
use serde_json::{json, Value};

/// Upstream error text shown to the user is cut at this length
const ERROR_TEXT_CAP: usize = 280;

/// Messages of history handed to the assistant fallback as context
const CONTEXT_WINDOW: usize = 6;

pub struct CommandExecutor<T, G, N> {
    transport: T,
    gate: G,
    notifier: N,
    summary: Option<SummaryClient>,
}

impl<T, G, N> CommandExecutor<T, G, N>
where
    T: RelayTransport + Sync,
    G: ConfirmGate + Sync,
    N: Notifier,
{
    pub fn new(transport: T, gate: G, notifier: N) -> Self {
        Self {
            transport,
            gate,
            notifier,
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: Option<SummaryClient>) -> Self {
        self.summary = summary;
        self
    }

    /// Execute one classified intent, returning the user-visible text
    ///
    /// The returned text has already been appended to history (except for
    /// the streaming path, where the reply arrives via the connection
    /// events instead of this call).
    pub async fn execute(
        &self,
        intent: Intent,
        history: &mut ChatHistory,
        socket: Option<&RelaySocket>,
    ) -> String {
        // Attach conversation context before approval: the gate must see
        // the exact payload that goes out, context included.
        let intent = match intent {
            Intent::AiAssistant { query, payload } => {
                let context: Vec<Value> = history
                    .recent(CONTEXT_WINDOW)
                    .iter()
                    .map(|m| json!({"role": m.role, "content": m.content}))
                    .collect();
                Intent::AiAssistant {
                    query,
                    payload: payload.kwarg("context", Value::Array(context)),
                }
            }
            other => other,
        };

        let approval_payload = approval_preview(&intent);
        if !self.gate.confirm(&approval_payload).await {
            let text = AssistantError::Cancelled.to_string();
            self.notifier.notify(NoticeKind::Info, &text);
            history.push(Role::Assistant, text.clone());
            return text;
        }

        tracing::info!(intent = intent.label(), "executing");
        match intent {
            Intent::SearchEmployee { name, dept, limit } => {
                self.execute_employee_search(name, dept, limit, history).await
            }
            Intent::SalesAnalysis(payload) => {
                self.execute_series(payload, "Monthly sales", history).await
            }
            Intent::PurchaseAnalysis(payload) => {
                self.execute_series(payload, "Monthly purchases", history).await
            }
            Intent::FinancialAnalysis(payload) => {
                self.execute_series(payload, "Monthly invoice totals", history).await
            }
            Intent::GenerateDashboard(payload) => {
                self.execute_series(payload, "Dashboard preview: monthly revenue", history)
                    .await
            }
            Intent::TopCustomer(payload) => {
                self.execute_aggregation(payload, "top customers", history).await
            }
            Intent::ProductPerformance(payload) => {
                self.execute_aggregation(payload, "product performance", history)
                    .await
            }
            Intent::SupplierPerformance(payload) => {
                self.execute_aggregation(payload, "supplier performance", history)
                    .await
            }
            Intent::InventoryAnalysis(payload) => {
                self.execute_aggregation(payload, "inventory", history).await
            }
            Intent::AiAssistant { query, payload } => {
                self.execute_assistant(query, payload, history, socket).await
            }
        }
    }

    // ========================================================================
    // Employee search: dedicated endpoint -> department-scoped -> generic
    // ========================================================================

    async fn execute_employee_search(
        &self,
        name: Option<String>,
        dept: Option<String>,
        limit: u32,
        history: &mut ChatHistory,
    ) -> String {
        let mut diary = CascadeDiary::new();

        // Tier 1: dedicated lookup endpoint
        let query = EmployeeQuery {
            name: name.clone(),
            limit,
            department: None,
        };
        match self.try_employee_query(&query).await {
            TierOutcome::Success(records) => {
                return self.reply_with_records(records, "employee search", history).await;
            }
            TierOutcome::Failure(reason) => diary.record("dedicated lookup", reason),
        }

        // Tier 2: resolve the department, then re-query scoped by it
        if let Some(ref dept_name) = dept {
            match self.resolve_department(dept_name).await {
                Ok(department_id) => {
                    let scoped = EmployeeQuery {
                        name: name.clone(),
                        limit,
                        department: Some(department_id),
                    };
                    match self.try_employee_query(&scoped).await {
                        TierOutcome::Success(records) => {
                            return self
                                .reply_with_records(records, "employee search", history)
                                .await;
                        }
                        TierOutcome::Failure(reason) => {
                            diary.record("department-scoped lookup", reason)
                        }
                    }
                }
                Err(reason) => diary.record("department resolution", reason),
            }
        }

        // Tier 3: generic record search filtered by name
        let domain = match &name {
            Some(name) => json!([["name", "ilike", name]]),
            None => json!([]),
        };
        let payload = RpcPayload::new("hr.employee", "search_read")
            .arg(domain)
            .arg(json!(["name", "department_id", "work_email", "job_title"]))
            .kwarg("limit", json!(limit));
        match self.try_call(&payload).await {
            TierOutcome::Success(records) => {
                self.reply_with_records(records, "employee search", history).await
            }
            TierOutcome::Failure(reason) => {
                diary.record("generic search", reason);
                // Surface the last tier's reason, not a generic message
                self.fail(history, diary.last_reason())
            }
        }
    }

    async fn resolve_department(&self, dept_name: &str) -> Result<i64, String> {
        let payload = RpcPayload::new("hr.department", "search_read")
            .arg(json!([["name", "ilike", dept_name]]))
            .arg(json!(["id", "name"]))
            .kwarg("limit", json!(1));
        match self.try_call(&payload).await {
            TierOutcome::Success(records) => records
                .first()
                .and_then(|record| record.get("id"))
                .and_then(Value::as_i64)
                .ok_or_else(|| format!("no department matching '{}'", dept_name)),
            TierOutcome::Failure(reason) => Err(reason),
        }
    }

    async fn try_employee_query(&self, query: &EmployeeQuery) -> TierOutcome {
        match self.transport.search_employees(query).await {
            Ok(RelayReply::Success(value)) => TierOutcome::Success(into_records(value)),
            Ok(RelayReply::Failure(reason)) => TierOutcome::Failure(reason),
            Ok(RelayReply::Raw(body)) => {
                TierOutcome::Failure(format!("unexpected response: {}", truncate(&body)))
            }
            Err(e) => TierOutcome::Failure(e.to_string()),
        }
    }

    // ========================================================================
    // Single-call aggregations and series
    // ========================================================================

    async fn execute_aggregation(
        &self,
        payload: RpcPayload,
        what: &str,
        history: &mut ChatHistory,
    ) -> String {
        match self.try_call(&payload).await {
            TierOutcome::Success(records) => self.reply_with_records(records, what, history).await,
            TierOutcome::Failure(reason) => self.fail(history, truncate(&reason)),
        }
    }

    async fn execute_series(
        &self,
        payload: RpcPayload,
        title: &str,
        history: &mut ChatHistory,
    ) -> String {
        let label_key = groupby_key(&payload);
        match self.try_call(&payload).await {
            TierOutcome::Success(records) => {
                let outcome = aggregate_series(&records, &label_key, "amount_total");
                let text = render_series(&outcome, title);
                history.push(Role::Assistant, text.clone());
                text
            }
            TierOutcome::Failure(reason) => self.fail(history, truncate(&reason)),
        }
    }

    // ========================================================================
    // Assistant query: socket -> RPC -> summary service -> record search
    // ========================================================================

    async fn execute_assistant(
        &self,
        query: String,
        payload: RpcPayload,
        history: &mut ChatHistory,
        socket: Option<&RelaySocket>,
    ) -> String {
        // Over a live connection the reply arrives asynchronously through
        // the stream reassembler, not as a response to this call.
        if let Some(socket) = socket.filter(|s| s.is_connected()) {
            return match socket.send(&payload) {
                Ok(()) => String::new(),
                Err(e) => self.fail(history, e.to_string()),
            };
        }

        let mut diary = CascadeDiary::new();
        match self.transport.call(&payload).await {
            Ok(RelayReply::Success(value)) => {
                let text = reply_text(value);
                history.push(Role::Assistant, text.clone());
                return text;
            }
            Ok(RelayReply::Failure(reason)) if !is_capability_absent(&reason) => {
                return self.fail(history, truncate(&reason));
            }
            Ok(RelayReply::Failure(reason)) => {
                diary.record("assistant call", reason);
            }
            Ok(RelayReply::Raw(body)) if !is_capability_absent(&body) => {
                // Protocol oddity, not an error: pass the text through
                history.push(Role::Assistant, body.clone());
                return body;
            }
            Ok(RelayReply::Raw(body)) => {
                diary.record("assistant call", truncate(&body));
            }
            Err(e) => {
                return self.fail(history, e.to_string());
            }
        }

        // The assistant capability is absent upstream: fall back to the
        // summarization service with recent conversation as context.
        if let Some(ref summary) = self.summary {
            match summary
                .answer_with_context(&query, history.recent(CONTEXT_WINDOW))
                .await
            {
                Ok(text) => {
                    history.push(Role::Assistant, text.clone());
                    return text;
                }
                Err(e) => diary.record("summary service", e.to_string()),
            }
        } else {
            diary.record("summary service", "no service key configured");
        }

        // Last resort: targeted record search on the query text
        let fallback = RpcPayload::new("res.partner", "search_read")
            .arg(json!([["name", "ilike", query]]))
            .arg(json!(["name", "email", "phone"]))
            .kwarg("limit", json!(5));
        match self.try_call(&fallback).await {
            TierOutcome::Success(records) if !records.is_empty() => {
                let text = format!(
                    "The assistant is unavailable; here are records matching your query.\n{}",
                    format_records(&records, &query)
                );
                history.push(Role::Assistant, text.clone());
                text
            }
            TierOutcome::Success(_) => {
                diary.record("record search", "no matching records");
                self.fail(history, diary.combined_reasons())
            }
            TierOutcome::Failure(reason) => {
                diary.record("record search", reason);
                self.fail(history, diary.combined_reasons())
            }
        }
    }

    // ========================================================================
    // Shared plumbing
    // ========================================================================

    async fn try_call(&self, payload: &RpcPayload) -> TierOutcome {
        match self.transport.call(payload).await {
            Ok(RelayReply::Success(value)) => TierOutcome::Success(into_records(value)),
            Ok(RelayReply::Failure(reason)) => TierOutcome::Failure(reason),
            Ok(RelayReply::Raw(body)) => {
                TierOutcome::Failure(format!("unexpected response: {}", truncate(&body)))
            }
            Err(e) => TierOutcome::Failure(e.to_string()),
        }
    }

    async fn reply_with_records(
        &self,
        records: Vec<Value>,
        what: &str,
        history: &mut ChatHistory,
    ) -> String {
        let text = summarize(&records, what, self.summary.as_ref(), None).await;
        history.push(Role::Assistant, text.clone());
        text
    }

    fn fail(&self, history: &mut ChatHistory, reason: String) -> String {
        self.notifier.notify(NoticeKind::Error, &reason);
        history.push(Role::Assistant, reason.clone());
        reason
    }
}

/// The exact payload shown to the human for approval
fn approval_preview(intent: &Intent) -> Value {
    match intent {
        Intent::SearchEmployee { name, dept, limit } => json!({
            "endpoint": "employee search",
            "name": name,
            "department": dept,
            "limit": limit,
        }),
        Intent::TopCustomer(p)
        | Intent::SalesAnalysis(p)
        | Intent::ProductPerformance(p)
        | Intent::InventoryAnalysis(p)
        | Intent::SupplierPerformance(p)
        | Intent::PurchaseAnalysis(p)
        | Intent::FinancialAnalysis(p)
        | Intent::GenerateDashboard(p) => serde_json::to_value(p).unwrap_or(Value::Null),
        Intent::AiAssistant { payload, .. } => {
            serde_json::to_value(payload).unwrap_or(Value::Null)
        }
    }
}

/// Coerce a success result into a record list
fn into_records(value: Value) -> Vec<Value> {
    match value {
        Value::Array(records) => records,
        Value::Null => Vec::new(),
        // Some endpoints wrap the rows one level down
        Value::Object(ref map) => match map.get("records").or_else(|| map.get("rows")) {
            Some(Value::Array(records)) => records.clone(),
            _ => vec![value],
        },
        other => vec![other],
    }
}

/// Text of an assistant reply result
fn reply_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Object(ref map) => map
            .get("answer")
            .or_else(|| map.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}

/// Grouping key named by a read_group payload (third positional arg)
fn groupby_key(payload: &RpcPayload) -> String {
    payload
        .args
        .get(2)
        .and_then(|arg| arg.as_array())
        .and_then(|groupby| groupby.first())
        .and_then(Value::as_str)
        .unwrap_or("date:month")
        .to_string()
}

/// Render a chronological series plus a note about unmapped rows
fn render_series(outcome: &SeriesOutcome, title: &str) -> String {
    if outcome.buckets.is_empty() && outcome.unmapped.is_empty() {
        return format!("{}: no data.", title);
    }
    let mut out = format!("{}:\n", title);
    for bucket in outcome.display_series() {
        out.push_str(&format!("  {}  {:.2}\n", bucket.period, bucket.value));
    }
    if !outcome.unmapped.is_empty() {
        out.push_str(&format!(
            "  ({} row(s) had unrecognized period labels)\n",
            outcome.unmapped.len()
        ));
    }
    out.trim_end().to_string()
}

/// Bound user-facing error text so a relay stack trace stays short
fn truncate(text: &str) -> String {
    if text.chars().count() <= ERROR_TEXT_CAP {
        text.to_string()
    } else {
        let cut: String = text.chars().take(ERROR_TEXT_CAP).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_bounds_long_text() {
        let long = "x".repeat(500);
        let cut = truncate(&long);
        assert_eq!(cut.chars().count(), ERROR_TEXT_CAP + 1);
        assert!(cut.ends_with('…'));
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn test_groupby_key_from_payload() {
        let payload = RpcPayload::new("sale.order", "read_group")
            .arg(json!([]))
            .arg(json!(["amount_total"]))
            .arg(json!(["date_order:month"]));
        assert_eq!(groupby_key(&payload), "date_order:month");

        let bare = RpcPayload::new("sale.order", "read_group");
        assert_eq!(groupby_key(&bare), "date:month");
    }

    #[test]
    fn test_into_records_shapes() {
        assert_eq!(into_records(json!([1, 2])), vec![json!(1), json!(2)]);
        assert!(into_records(Value::Null).is_empty());
        assert_eq!(
            into_records(json!({"records": [{"a": 1}]})),
            vec![json!({"a": 1})]
        );
        assert_eq!(into_records(json!(7)), vec![json!(7)]);
    }

    #[test]
    fn test_reply_text_shapes() {
        assert_eq!(reply_text(json!("hello")), "hello");
        assert_eq!(reply_text(json!({"answer": "42"})), "42");
        assert_eq!(reply_text(json!(3)), "3");
    }

    #[test]
    fn test_render_series_includes_unmapped_note() {
        let outcome = SeriesOutcome {
            buckets: vec![crate::core::types::MonthBucket {
                period: "2025-01".into(),
                value: 10.0,
            }],
            unmapped: vec![crate::core::types::UnmappedEntry {
                raw: json!("Q1"),
                normalized: String::new(),
                amount: 5.0,
                original: json!({}),
            }],
        };
        let text = render_series(&outcome, "Monthly sales");
        assert!(text.contains("2025-01  10.00"));
        assert!(text.contains("1 row(s) had unrecognized period labels"));
    }
}
