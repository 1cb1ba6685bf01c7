//! Domain models for utility-billing-service.

mod bill;
mod complaint;
mod connection;
mod customer;
mod lifecycle;
mod meter;
mod payment;
mod work_order;

pub use bill::{
    Bill, BillAction, BillStatus, BillStatusTotals, BillTax, CreateBill, CreateBillTax,
    ListBillsFilter,
};
pub use complaint::{
    Complaint, ComplaintAction, ComplaintStatus, ComplaintUpdate, CreateComplaint,
    ListComplaintsFilter,
};
pub use connection::{
    ConnectionAction, ConnectionStatus, CreateConnection, ListConnectionsFilter,
    ServiceConnection, UtilityType,
};
pub use customer::{CreateCustomer, Customer, CustomerType, ListCustomersFilter};
pub use lifecycle::{ParseEnumError, TransitionError};
pub use meter::{CreateMeter, CreateReading, Meter, MeterReading, ReadingSource};
pub use payment::{ListPaymentsFilter, Payment, PaymentMethod, RecordPayment};
pub use work_order::{
    CreateWorkOrder, ListWorkOrdersFilter, WorkOrder, WorkOrderItemUsage, WorkOrderLabor,
    WorkOrderPriority, WorkOrderStatus, WorkOrderUpdate,
};

/// Sort direction shared by every list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Page/limit/sort after validation; `sort_column` is already whitelisted.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
    pub sort_column: &'static str,
    pub order: SortOrder,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}
