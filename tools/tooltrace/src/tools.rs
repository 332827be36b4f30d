//! Tool surface seen by workloads, a deterministic mock backend, and the
//! recording wrapper that routes every call through a [`TraceLedger`].

use crate::errors::TooltraceError;
use crate::ledger::{Trace, TraceLedger};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const GET_ORDERS: &str = "GET:orders";
pub const WRITE_REPORT: &str = "WRITE:report";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: u64,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportReceipt {
    pub status: String,
    pub bytes: usize,
}

#[derive(Debug, Serialize)]
struct OrdersQuery {
    customer_id: u64,
}

#[derive(Debug, Serialize)]
struct ReportRequest<'a> {
    text: &'a str,
}

/// Tools a workload may call. Implementations must be deterministic: the same
/// input always yields the same output.
pub trait Tools {
    fn get_orders(&mut self, customer_id: u64) -> Result<Vec<Order>, TooltraceError>;
    fn write_report(&mut self, text: &str) -> Result<ReportReceipt, TooltraceError>;
}

impl<T: Tools + ?Sized> Tools for &mut T {
    fn get_orders(&mut self, customer_id: u64) -> Result<Vec<Order>, TooltraceError> {
        (**self).get_orders(customer_id)
    }

    fn write_report(&mut self, text: &str) -> Result<ReportReceipt, TooltraceError> {
        (**self).write_report(text)
    }
}

/// In-memory tool backend with a fixed order table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockTools {
    orders: BTreeMap<u64, Vec<Order>>,
}

impl MockTools {
    pub fn new(orders: BTreeMap<u64, Vec<Order>>) -> Self {
        Self { orders }
    }
}

impl Default for MockTools {
    fn default() -> Self {
        let mut orders = BTreeMap::new();
        orders.insert(
            123,
            vec![
                Order {
                    order_id: 1,
                    amount: 120,
                },
                Order {
                    order_id: 2,
                    amount: 80,
                },
            ],
        );
        Self::new(orders)
    }
}

impl Tools for MockTools {
    fn get_orders(&mut self, customer_id: u64) -> Result<Vec<Order>, TooltraceError> {
        Ok(self.orders.get(&customer_id).cloned().unwrap_or_default())
    }

    fn write_report(&mut self, text: &str) -> Result<ReportReceipt, TooltraceError> {
        Ok(ReportReceipt {
            status: "ok".to_string(),
            bytes: text.len(),
        })
    }
}

/// Wraps any [`Tools`] backend, recording every call into its own ledger.
///
/// Each wrapper owns a fresh [`TraceLedger`], so two runs built from two
/// wrappers can never observe each other's records.
pub struct RecordingTools<T: Tools> {
    inner: T,
    ledger: TraceLedger,
}

impl<T: Tools> RecordingTools<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            ledger: TraceLedger::new(),
        }
    }

    pub fn ledger(&self) -> &TraceLedger {
        &self.ledger
    }

    pub fn into_trace(self) -> Trace {
        self.ledger.finish()
    }
}

impl<T: Tools> Tools for RecordingTools<T> {
    fn get_orders(&mut self, customer_id: u64) -> Result<Vec<Order>, TooltraceError> {
        let Self { inner, ledger } = self;
        ledger.try_invoke(GET_ORDERS, &OrdersQuery { customer_id }, |query| {
            inner.get_orders(query.customer_id)
        })
    }

    fn write_report(&mut self, text: &str) -> Result<ReportReceipt, TooltraceError> {
        let Self { inner, ledger } = self;
        ledger.try_invoke(WRITE_REPORT, &ReportRequest { text }, |request| {
            inner.write_report(request.text)
        })
    }
}
