//! Rule-based intent classification
//!
//! An ordered list of rule groups is evaluated top to bottom; the first
//! matching group wins and no combination of matches is attempted. Every
//! input resolves to exactly one intent, with the assistant query as the
//! catch-all, so classification is total and never fails.

use crate::intent::extract;
use crate::relay::protocol::RpcPayload;
use chrono::Datelike;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;

/// Classified interpretation of a free-text query
///
/// Every variant except `SearchEmployee` reduces to a generic RPC payload;
/// the employee search targets a dedicated endpoint and carries its own
/// narrow shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    SearchEmployee {
        name: Option<String>,
        dept: Option<String>,
        limit: u32,
    },
    TopCustomer(RpcPayload),
    SalesAnalysis(RpcPayload),
    ProductPerformance(RpcPayload),
    InventoryAnalysis(RpcPayload),
    SupplierPerformance(RpcPayload),
    PurchaseAnalysis(RpcPayload),
    FinancialAnalysis(RpcPayload),
    GenerateDashboard(RpcPayload),
    AiAssistant {
        query: String,
        payload: RpcPayload,
    },
}

impl Intent {
    /// Short label used in logs and notifications
    pub fn label(&self) -> &'static str {
        match self {
            Intent::SearchEmployee { .. } => "employee search",
            Intent::TopCustomer(_) => "top customers",
            Intent::SalesAnalysis(_) => "sales analysis",
            Intent::ProductPerformance(_) => "product performance",
            Intent::InventoryAnalysis(_) => "inventory analysis",
            Intent::SupplierPerformance(_) => "supplier performance",
            Intent::PurchaseAnalysis(_) => "purchase analysis",
            Intent::FinancialAnalysis(_) => "financial analysis",
            Intent::GenerateDashboard(_) => "dashboard",
            Intent::AiAssistant { .. } => "assistant query",
        }
    }
}

/// One rule group: a membership predicate over the lowercased text and a
/// builder that extracts auxiliary parameters from the original text
struct RuleGroup {
    name: &'static str,
    matches: fn(&str) -> bool,
    build: fn(&str) -> Intent,
}

/// Rule groups in precedence order; first match wins
///
/// The final group matches everything, which is what makes `classify`
/// total.
const RULES: &[RuleGroup] = &[
    RuleGroup {
        name: "employee",
        matches: |text| EMPLOYEE_PATTERN.is_match(text) || FIND_IN_DEPT_PATTERN.is_match(text),
        build: build_search_employee,
    },
    RuleGroup {
        name: "top_customer",
        matches: |text| TOP_CUSTOMER_PATTERN.is_match(text),
        build: build_top_customer,
    },
    RuleGroup {
        name: "sales",
        matches: |text| SALES_PATTERN.is_match(text),
        build: build_sales_analysis,
    },
    RuleGroup {
        name: "product",
        matches: |text| PRODUCT_PATTERN.is_match(text),
        build: build_product_performance,
    },
    RuleGroup {
        name: "inventory",
        matches: |text| INVENTORY_PATTERN.is_match(text),
        build: build_inventory_analysis,
    },
    RuleGroup {
        name: "supplier",
        matches: |text| SUPPLIER_PATTERN.is_match(text),
        build: build_supplier_performance,
    },
    RuleGroup {
        name: "purchase",
        matches: |text| PURCHASE_PATTERN.is_match(text),
        build: build_purchase_analysis,
    },
    RuleGroup {
        name: "financial",
        matches: |text| FINANCIAL_PATTERN.is_match(text),
        build: build_financial_analysis,
    },
    RuleGroup {
        name: "dashboard",
        matches: |text| DASHBOARD_PATTERN.is_match(text),
        build: build_dashboard,
    },
    RuleGroup {
        name: "assistant",
        matches: |_| true,
        build: build_ai_assistant,
    },
];

/// Classify free text into exactly one intent
pub fn classify(text: &str) -> Intent {
    let lower = text.to_lowercase();
    for rule in RULES {
        if (rule.matches)(&lower) {
            tracing::debug!(rule = rule.name, "intent matched");
            return (rule.build)(text);
        }
    }
    unreachable!("the assistant rule matches every input");
}

// ============================================================================
// Predicates
// ============================================================================

static EMPLOYEE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(employees?|staff|personnel|workforce|colleagues?|hr)\b")
        .expect("Invalid regex")
});
// "find X in Y department" style lookups without an employee keyword
static FIND_IN_DEPT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(find|search|look\s*up|who)\b.*\b(department|team)\b").expect("Invalid regex")
});

static TOP_CUSTOMER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(top|best|biggest|highest|largest)\b.*\b(customers?|clients?|buyers?)\b")
        .expect("Invalid regex")
});

static SALES_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(sales?|revenue|turnover|income|trends?)\b").expect("Invalid regex")
});

static PRODUCT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(best[\s-]selling|most\s+sold|product\s+performance|top\s+products?)\b")
        .expect("Invalid regex")
});

static INVENTORY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(inventory|stock|warehouse|on\s+hand|availability)\b").expect("Invalid regex")
});

static SUPPLIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(suppliers?|vendors?)\b").expect("Invalid regex"));

static PURCHASE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(purchases?|purchasing|procurement)\b").expect("Invalid regex")
});

static FINANCIAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(financ\w*|accounting|invoices?|profit|expenses?|balance|cash\s*flow)\b")
        .expect("Invalid regex")
});

static DASHBOARD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(dashboards?|overview|kpis?)\b").expect("Invalid regex"));

// ============================================================================
// Builders
// ============================================================================

fn build_search_employee(text: &str) -> Intent {
    Intent::SearchEmployee {
        name: extract::extract_name(text),
        dept: extract::extract_department(text),
        limit: extract::extract_limit(text).unwrap_or(20),
    }
}

fn build_top_customer(text: &str) -> Intent {
    let limit = extract::extract_limit(text).unwrap_or(10);
    let payload = RpcPayload::new("sale.order", "read_group")
        .arg(year_domain("date_order", extract::extract_year(text)))
        .arg(json!(["amount_total"]))
        .arg(json!(["partner_id"]))
        .kwarg("orderby", json!("amount_total desc"))
        .kwarg("limit", json!(limit));
    Intent::TopCustomer(payload)
}

fn build_sales_analysis(text: &str) -> Intent {
    let payload = RpcPayload::new("sale.order", "read_group")
        .arg(year_domain("date_order", extract::extract_year(text)))
        .arg(json!(["amount_total"]))
        .arg(json!(["date_order:month"]));
    Intent::SalesAnalysis(payload)
}

fn build_product_performance(text: &str) -> Intent {
    let limit = extract::extract_limit(text).unwrap_or(10);
    let payload = RpcPayload::new("sale.order.line", "read_group")
        .arg(year_domain("create_date", extract::extract_year(text)))
        .arg(json!(["product_uom_qty", "price_total"]))
        .arg(json!(["product_id"]))
        .kwarg("orderby", json!("price_total desc"))
        .kwarg("limit", json!(limit));
    Intent::ProductPerformance(payload)
}

fn build_inventory_analysis(text: &str) -> Intent {
    let threshold = extract::extract_threshold(text).unwrap_or(10.0);
    let payload = RpcPayload::new("product.product", "search_read")
        .arg(json!([["qty_available", "<", threshold]]))
        .arg(json!(["name", "qty_available"]))
        .kwarg("limit", json!(20));
    Intent::InventoryAnalysis(payload)
}

fn build_supplier_performance(text: &str) -> Intent {
    let limit = extract::extract_limit(text).unwrap_or(10);
    let payload = RpcPayload::new("purchase.order", "read_group")
        .arg(year_domain("date_order", extract::extract_year(text)))
        .arg(json!(["amount_total"]))
        .arg(json!(["partner_id"]))
        .kwarg("orderby", json!("amount_total desc"))
        .kwarg("limit", json!(limit));
    Intent::SupplierPerformance(payload)
}

fn build_purchase_analysis(text: &str) -> Intent {
    let payload = RpcPayload::new("purchase.order", "read_group")
        .arg(year_domain("date_order", extract::extract_year(text)))
        .arg(json!(["amount_total"]))
        .arg(json!(["date_order:month"]));
    Intent::PurchaseAnalysis(payload)
}

fn build_financial_analysis(text: &str) -> Intent {
    let year = extract::extract_year(text);
    let mut domain = match year_domain("date", year) {
        Value::Array(clauses) => clauses,
        _ => Vec::new(),
    };
    domain.push(json!(["move_type", "=", "out_invoice"]));
    domain.push(json!(["state", "=", "posted"]));
    let payload = RpcPayload::new("account.move", "read_group")
        .arg(Value::Array(domain))
        .arg(json!(["amount_total"]))
        .arg(json!(["date:month"]));
    Intent::FinancialAnalysis(payload)
}

fn build_dashboard(text: &str) -> Intent {
    let year = extract::extract_year(text).unwrap_or_else(|| chrono::Utc::now().year());
    let payload = RpcPayload::new("sale.order", "read_group")
        .arg(year_domain("date_order", Some(year)))
        .arg(json!(["amount_total"]))
        .arg(json!(["date_order:month"]));
    Intent::GenerateDashboard(payload)
}

fn build_ai_assistant(text: &str) -> Intent {
    let payload = RpcPayload::new("ai.assistant", "ask").arg(json!(text));
    Intent::AiAssistant {
        query: text.to_string(),
        payload,
    }
}

/// Date domain bounded to a calendar year, or an empty domain when no
/// year was extracted
fn year_domain(field: &str, year: Option<i32>) -> Value {
    match year {
        Some(year) => json!([
            [field, ">=", format!("{:04}-01-01", year)],
            [field, "<=", format!("{:04}-12-31", year)]
        ]),
        None => json!([]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_employee_search_extraction() {
        let intent = classify("find Kogut in Sales department");
        assert_eq!(
            intent,
            Intent::SearchEmployee {
                name: Some("Kogut".to_string()),
                dept: Some("Sales".to_string()),
                limit: 20,
            }
        );
    }

    #[test]
    fn test_employee_beats_sales() {
        // Employee keyword plus revenue keyword resolves by precedence
        let intent = classify("which employees generated the most revenue");
        assert!(matches!(intent, Intent::SearchEmployee { .. }));
    }

    #[test]
    fn test_employee_partial_extraction_still_matches() {
        let intent = classify("show me all employees");
        assert_eq!(
            intent,
            Intent::SearchEmployee {
                name: None,
                dept: None,
                limit: 20,
            }
        );
    }

    #[test]
    fn test_top_customer_beats_sales() {
        let intent = classify("top 5 customers by revenue");
        match intent {
            Intent::TopCustomer(payload) => {
                assert_eq!(payload.model, "sale.order");
                assert_eq!(payload.kwargs["limit"], 5);
            }
            other => panic!("expected TopCustomer, got {:?}", other),
        }
    }

    #[test]
    fn test_monthly_sales_with_year() {
        let intent = classify("monthly sales for 2024");
        match intent {
            Intent::SalesAnalysis(payload) => {
                assert_eq!(payload.model, "sale.order");
                assert_eq!(payload.method, "read_group");
                assert_eq!(
                    payload.args[0],
                    serde_json::json!([
                        ["date_order", ">=", "2024-01-01"],
                        ["date_order", "<=", "2024-12-31"]
                    ])
                );
                assert_eq!(payload.args[2], serde_json::json!(["date_order:month"]));
            }
            other => panic!("expected SalesAnalysis, got {:?}", other),
        }
    }

    #[test]
    fn test_sales_without_year_has_empty_domain() {
        match classify("revenue trend") {
            Intent::SalesAnalysis(payload) => {
                assert_eq!(payload.args[0], serde_json::json!([]));
            }
            other => panic!("expected SalesAnalysis, got {:?}", other),
        }
    }

    #[test]
    fn test_sales_beats_product() {
        // Generic revenue aggregation outranks product aggregation
        assert!(matches!(
            classify("revenue by product"),
            Intent::SalesAnalysis(_)
        ));
    }

    #[test]
    fn test_best_selling_product() {
        match classify("best-selling products this quarter") {
            Intent::ProductPerformance(payload) => {
                assert_eq!(payload.model, "sale.order.line");
                assert_eq!(payload.kwargs["limit"], 10);
            }
            other => panic!("expected ProductPerformance, got {:?}", other),
        }
    }

    #[test]
    fn test_inventory_threshold() {
        match classify("products in stock below 15") {
            Intent::InventoryAnalysis(payload) => {
                assert_eq!(payload.model, "product.product");
                assert_eq!(
                    payload.args[0],
                    serde_json::json!([["qty_available", "<", 15.0]])
                );
            }
            other => panic!("expected InventoryAnalysis, got {:?}", other),
        }
    }

    #[test]
    fn test_supplier_vs_purchase() {
        assert!(matches!(
            classify("rank our suppliers"),
            Intent::SupplierPerformance(_)
        ));
        assert!(matches!(
            classify("purchase spending per month"),
            Intent::PurchaseAnalysis(_)
        ));
    }

    #[test]
    fn test_financial_analysis() {
        match classify("invoice totals for 2023") {
            Intent::FinancialAnalysis(payload) => {
                assert_eq!(payload.model, "account.move");
                let domain = payload.args[0].as_array().unwrap();
                assert!(domain.contains(&serde_json::json!(["move_type", "=", "out_invoice"])));
            }
            other => panic!("expected FinancialAnalysis, got {:?}", other),
        }
    }

    #[test]
    fn test_dashboard() {
        assert!(matches!(
            classify("generate a dashboard"),
            Intent::GenerateDashboard(_)
        ));
    }

    #[test]
    fn test_default_assistant() {
        match classify("what is the meaning of life") {
            Intent::AiAssistant { query, payload } => {
                assert_eq!(query, "what is the meaning of life");
                assert_eq!(payload.model, "ai.assistant");
                assert_eq!(payload.method, "ask");
                assert_eq!(payload.args[0], "what is the meaning of life");
            }
            other => panic!("expected AiAssistant, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_string_is_assistant() {
        assert!(matches!(classify(""), Intent::AiAssistant { .. }));
    }

    proptest! {
        /// Classification is total: any string produces exactly one intent
        #[test]
        fn prop_classify_is_total(text in ".{0,200}") {
            let _ = classify(&text);
        }

        /// Classification is deterministic
        #[test]
        fn prop_classify_is_deterministic(text in ".{0,80}") {
            prop_assert_eq!(classify(&text), classify(&text));
        }
    }
}
