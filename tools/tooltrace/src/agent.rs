use crate::errors::TooltraceError;
use crate::tools::Tools;

/// A scripted workload. Every externally visible action must go through
/// `tools`; the order of those calls is what replay verification checks.
pub trait Workload {
    fn name(&self) -> &str;
    fn run(&self, tools: &mut dyn Tools) -> Result<String, TooltraceError>;
}

/// Looks up a customer's orders, totals them and writes a one-line report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSummaryAgent {
    pub customer_id: u64,
}

impl OrderSummaryAgent {
    pub fn new(customer_id: u64) -> Self {
        Self { customer_id }
    }
}

impl Workload for OrderSummaryAgent {
    fn name(&self) -> &str {
        "order_summary"
    }

    fn run(&self, tools: &mut dyn Tools) -> Result<String, TooltraceError> {
        let orders = tools.get_orders(self.customer_id)?;
        let total = orders.iter().map(|order| order.amount).sum::<u64>();
        let summary = format!("Customer {} total amount: {total}", self.customer_id);
        tools.write_report(&summary)?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::{OrderSummaryAgent, Workload};
    use crate::tools::{MockTools, RecordingTools, GET_ORDERS, WRITE_REPORT};
    use serde_json::json;

    #[test]
    fn summary_totals_all_orders() {
        let mut tools = MockTools::default();
        let summary = OrderSummaryAgent::new(123)
            .run(&mut tools)
            .expect("run workload");
        assert_eq!(summary, "Customer 123 total amount: 200");
    }

    #[test]
    fn unknown_customer_reports_zero() {
        let mut tools = MockTools::default();
        let summary = OrderSummaryAgent::new(7).run(&mut tools).expect("run");
        assert_eq!(summary, "Customer 7 total amount: 0");
    }

    #[test]
    fn workload_issues_read_then_write() {
        let mut tools = RecordingTools::new(MockTools::default());
        OrderSummaryAgent::new(123)
            .run(&mut tools)
            .expect("run workload");
        let trace = tools.into_trace();
        let tools_called = trace.iter().map(|r| r.tool.as_str()).collect::<Vec<_>>();
        assert_eq!(tools_called, vec![GET_ORDERS, WRITE_REPORT]);
        assert_eq!(
            trace.records()[1].input,
            json!({"text": "Customer 123 total amount: 200"})
        );
    }
}
