//! Database service for utility-billing-service.

#![allow(clippy::too_many_arguments)]

use crate::models::{
    Bill, BillAction, BillStatus, BillStatusTotals, BillTax, Complaint, ComplaintAction,
    ConnectionAction, ConnectionStatus, CreateBill, CreateComplaint, CreateConnection,
    CreateCustomer, CreateMeter, CreateReading, CreateWorkOrder, Customer, ListBillsFilter,
    ListComplaintsFilter, ListConnectionsFilter, ListCustomersFilter, ListPaymentsFilter,
    ListWorkOrdersFilter, Meter, MeterReading, PageRequest, Payment, PaymentMethod,
    RecordPayment, ServiceConnection, WorkOrder, WorkOrderItemUsage, WorkOrderLabor,
    WorkOrderStatus,
};
use crate::services::allocator::{
    allocate_payment, receipt_number, validate_payment_input, AllocationPlan, OutstandingBill,
};
use crate::services::calculator::{calculate_bill_total, BillCharges, BillTotals};
use crate::services::costing::WorkOrderCostRow;
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::reconciliation::CollectedPayment;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

macro_rules! customer_columns {
    () => {
        "customer_id, account_number, full_name, email, phone, address, customer_type, created_utc, updated_utc"
    };
}

macro_rules! connection_columns {
    () => {
        "connection_id, customer_id, utility_type, tariff_code, service_address, status, activated_utc, disconnected_utc, created_utc, updated_utc"
    };
}

macro_rules! meter_columns {
    () => {
        "meter_id, connection_id, serial_number, meter_type, multiplier, installed_on, is_active, created_utc, updated_utc"
    };
}

macro_rules! reading_columns {
    () => {
        "reading_id, meter_id, reading_value, previous_value, consumption, reading_date, reading_source, created_utc"
    };
}

macro_rules! bill_columns {
    () => {
        "bill_id, customer_id, meter_id, billing_period_start, billing_period_end, energy_charge_amount, fixed_charge_amount, subsidy_amount, solar_export_credit, tax_amount, total_amount, amount_paid, due_date, bill_status, version, created_utc, updated_utc"
    };
}

macro_rules! payment_columns {
    () => {
        "payment_id, customer_id, bill_id, receipt_number, payment_amount, payment_method, payment_date, transaction_ref, notes, recorded_by, created_utc"
    };
}

macro_rules! complaint_columns {
    () => {
        "complaint_id, customer_id, complaint_type, description, status, assigned_employee_id, resolution_notes, resolved_date, resolution_time_hours, created_utc, updated_utc"
    };
}

macro_rules! work_order_columns {
    () => {
        "work_order_id, title, description, work_order_type, priority, connection_id, complaint_id, assigned_employee_id, status, scheduled_start, scheduled_end, resolution_notes, closed_ts, created_utc, updated_utc"
    };
}

/// Outcome of a persisted cashier payment.
#[derive(Debug, Clone)]
pub struct RecordedPayment {
    pub receipt_number: String,
    pub plan: AllocationPlan,
    /// One row per bill that received money.
    pub payments: Vec<Payment>,
}

#[derive(Debug, FromRow)]
struct MethodAmountRow {
    payment_method: String,
    payment_amount: Decimal,
}

fn db_error(context: &str, e: sqlx::Error) -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("Failed to {}: {}", context, e))
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "utility-billing-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Pool that opens connections on first use.
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(2))
            .connect_lazy(database_url)
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Invalid database url: {}", e)))?;
        Ok(Self { pool })
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Count and fetch one page of `table` narrowed by `filters`.
    async fn fetch_page<T, F>(
        &self,
        operation: &'static str,
        columns: &str,
        table: &str,
        filters: F,
        page: &PageRequest,
    ) -> Result<(Vec<T>, i64), AppError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        F: Fn(&mut QueryBuilder<'static, Postgres>),
    {
        let timer = DB_QUERY_DURATION
            .with_label_values(&[operation])
            .start_timer();

        let mut count = QueryBuilder::new(format!("SELECT COUNT(*) FROM {} WHERE TRUE", table));
        filters(&mut count);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error(operation, e))?;

        let mut query = QueryBuilder::new(format!("SELECT {} FROM {} WHERE TRUE", columns, table));
        filters(&mut query);
        query.push(format_args!(
            " ORDER BY {} {}",
            page.sort_column,
            page.order.as_sql()
        ));
        query
            .push(" LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = query
            .build_query_as::<T>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error(operation, e))?;

        timer.observe_duration();
        Ok((rows, total))
    }

    async fn exists(&self, table: &str, column: &str, id: Uuid) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(&format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE {} = $1)",
            table, column
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("check existence", e))
    }

    async fn require(&self, table: &str, column: &str, id: Uuid, what: &str) -> Result<(), AppError> {
        if self.exists(table, column, id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(anyhow::anyhow!("{} {} not found", what, id)))
        }
    }

    // =========================================================================
    // Customer Operations
    // =========================================================================

    #[instrument(skip(self, input), fields(account_number = %input.account_number))]
    pub async fn create_customer(&self, input: &CreateCustomer) -> Result<Customer, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_customer"])
            .start_timer();

        let result = sqlx::query_as::<_, Customer>(concat!(
            "INSERT INTO customers (customer_id, account_number, full_name, email, phone, address, customer_type) ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING ",
            customer_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(&input.account_number)
        .bind(&input.full_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(input.customer_type.as_str())
        .fetch_one(&self.pool)
        .await;

        let customer = match result {
            Ok(customer) => customer,
            Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Account number {} already exists",
                    input.account_number
                )));
            }
            Err(e) => return Err(db_error("create customer", e)),
        };

        timer.observe_duration();
        info!(customer_id = %customer.customer_id, "Customer created");
        Ok(customer)
    }

    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn get_customer(&self, customer_id: Uuid) -> Result<Customer, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_customer"])
            .start_timer();

        let customer = sqlx::query_as::<_, Customer>(concat!(
            "SELECT ",
            customer_columns!(),
            " FROM customers WHERE customer_id = $1"
        ))
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get customer", e))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer {} not found", customer_id)))?;

        timer.observe_duration();
        Ok(customer)
    }

    #[instrument(skip(self))]
    pub async fn list_customers(
        &self,
        filter: &ListCustomersFilter,
        page: &PageRequest,
    ) -> Result<(Vec<Customer>, i64), AppError> {
        let filter = filter.clone();
        self.fetch_page(
            "list_customers",
            customer_columns!(),
            "customers",
            move |qb| {
                if let Some(search) = &filter.search {
                    let pattern = format!("%{}%", search);
                    qb.push(" AND (full_name ILIKE ")
                        .push_bind(pattern.clone())
                        .push(" OR account_number ILIKE ")
                        .push_bind(pattern)
                        .push(")");
                }
                if let Some(customer_type) = filter.customer_type {
                    qb.push(" AND customer_type = ")
                        .push_bind(customer_type.as_str());
                }
            },
            page,
        )
        .await
    }

    // =========================================================================
    // Service Connection Operations
    // =========================================================================

    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_connection(
        &self,
        input: &CreateConnection,
    ) -> Result<ServiceConnection, AppError> {
        self.require("customers", "customer_id", input.customer_id, "Customer")
            .await?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_connection"])
            .start_timer();

        let connection = sqlx::query_as::<_, ServiceConnection>(concat!(
            "INSERT INTO service_connections (connection_id, customer_id, utility_type, tariff_code, service_address, status) ",
            "VALUES ($1, $2, $3, $4, $5, $6) RETURNING ",
            connection_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(input.customer_id)
        .bind(input.utility_type.as_str())
        .bind(&input.tariff_code)
        .bind(&input.service_address)
        .bind(ConnectionStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create connection", e))?;

        timer.observe_duration();
        info!(connection_id = %connection.connection_id, "Service connection created");
        Ok(connection)
    }

    #[instrument(skip(self), fields(connection_id = %connection_id))]
    pub async fn get_connection(&self, connection_id: Uuid) -> Result<ServiceConnection, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_connection"])
            .start_timer();

        let connection = sqlx::query_as::<_, ServiceConnection>(concat!(
            "SELECT ",
            connection_columns!(),
            " FROM service_connections WHERE connection_id = $1"
        ))
        .bind(connection_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get connection", e))?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Connection {} not found", connection_id))
        })?;

        timer.observe_duration();
        Ok(connection)
    }

    #[instrument(skip(self))]
    pub async fn list_connections(
        &self,
        filter: &ListConnectionsFilter,
        page: &PageRequest,
    ) -> Result<(Vec<ServiceConnection>, i64), AppError> {
        let filter = filter.clone();
        self.fetch_page(
            "list_connections",
            connection_columns!(),
            "service_connections",
            move |qb| {
                if let Some(customer_id) = filter.customer_id {
                    qb.push(" AND customer_id = ").push_bind(customer_id);
                }
                if let Some(status) = filter.status {
                    qb.push(" AND status = ").push_bind(status.as_str());
                }
                if let Some(utility_type) = filter.utility_type {
                    qb.push(" AND utility_type = ").push_bind(utility_type.as_str());
                }
            },
            page,
        )
        .await
    }

    /// Apply a lifecycle action under a row lock.
    #[instrument(skip(self), fields(connection_id = %connection_id, action = action.as_str()))]
    pub async fn transition_connection(
        &self,
        connection_id: Uuid,
        action: ConnectionAction,
    ) -> Result<ServiceConnection, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["transition_connection"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        let current = sqlx::query_as::<_, ServiceConnection>(concat!(
            "SELECT ",
            connection_columns!(),
            " FROM service_connections WHERE connection_id = $1 FOR UPDATE"
        ))
        .bind(connection_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("lock connection", e))?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Connection {} not found", connection_id))
        })?;

        let from: ConnectionStatus = current.status.parse()?;
        let to = from.apply(action)?;
        let now = Utc::now();

        let activated_utc = match action {
            ConnectionAction::Activate => Some(now),
            _ => current.activated_utc,
        };
        let disconnected_utc = match to {
            ConnectionStatus::Disconnected => Some(now),
            _ => current.disconnected_utc,
        };

        let updated = sqlx::query_as::<_, ServiceConnection>(concat!(
            "UPDATE service_connections SET status = $1, activated_utc = $2, disconnected_utc = $3, updated_utc = NOW() ",
            "WHERE connection_id = $4 RETURNING ",
            connection_columns!()
        ))
        .bind(to.as_str())
        .bind(activated_utc)
        .bind(disconnected_utc)
        .bind(connection_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("update connection", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit transaction", e))?;

        timer.observe_duration();
        info!(from = from.as_str(), to = to.as_str(), "Connection status changed");
        Ok(updated)
    }

    // =========================================================================
    // Meter Operations
    // =========================================================================

    #[instrument(skip(self, input), fields(serial_number = %input.serial_number))]
    pub async fn create_meter(&self, input: &CreateMeter) -> Result<Meter, AppError> {
        self.require(
            "service_connections",
            "connection_id",
            input.connection_id,
            "Connection",
        )
        .await?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_meter"])
            .start_timer();

        let result = sqlx::query_as::<_, Meter>(concat!(
            "INSERT INTO meters (meter_id, connection_id, serial_number, meter_type, multiplier, installed_on) ",
            "VALUES ($1, $2, $3, $4, $5, $6) RETURNING ",
            meter_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(input.connection_id)
        .bind(&input.serial_number)
        .bind(&input.meter_type)
        .bind(input.multiplier)
        .bind(input.installed_on)
        .fetch_one(&self.pool)
        .await;

        let meter = match result {
            Ok(meter) => meter,
            Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Meter serial {} already registered",
                    input.serial_number
                )));
            }
            Err(e) => return Err(db_error("create meter", e)),
        };

        timer.observe_duration();
        info!(meter_id = %meter.meter_id, "Meter created");
        Ok(meter)
    }

    #[instrument(skip(self), fields(meter_id = %meter_id))]
    pub async fn get_meter(&self, meter_id: Uuid) -> Result<Meter, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_meter"])
            .start_timer();

        let meter = sqlx::query_as::<_, Meter>(concat!(
            "SELECT ",
            meter_columns!(),
            " FROM meters WHERE meter_id = $1"
        ))
        .bind(meter_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get meter", e))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Meter {} not found", meter_id)))?;

        timer.observe_duration();
        Ok(meter)
    }

    #[instrument(skip(self))]
    pub async fn list_meters(
        &self,
        connection_id: Option<Uuid>,
        page: &PageRequest,
    ) -> Result<(Vec<Meter>, i64), AppError> {
        self.fetch_page(
            "list_meters",
            meter_columns!(),
            "meters",
            move |qb| {
                if let Some(connection_id) = connection_id {
                    qb.push(" AND connection_id = ").push_bind(connection_id);
                }
            },
            page,
        )
        .await
    }

    /// Store a register reading; the first reading of a meter is its baseline.
    #[instrument(skip(self, input), fields(meter_id = %input.meter_id))]
    pub async fn record_reading(&self, input: &CreateReading) -> Result<MeterReading, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_reading"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        let meter = sqlx::query_as::<_, Meter>(concat!(
            "SELECT ",
            meter_columns!(),
            " FROM meters WHERE meter_id = $1 FOR UPDATE"
        ))
        .bind(input.meter_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("lock meter", e))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Meter {} not found", input.meter_id)))?;

        if !meter.is_active {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Meter {} is not active",
                meter.meter_id
            )));
        }

        let last = sqlx::query_as::<_, MeterReading>(concat!(
            "SELECT ",
            reading_columns!(),
            " FROM meter_readings WHERE meter_id = $1 ORDER BY reading_date DESC, created_utc DESC LIMIT 1"
        ))
        .bind(input.meter_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("get last reading", e))?;

        let previous_value = match &last {
            Some(last) if input.reading_date < last.reading_date => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Reading date {} precedes the last reading on {}",
                    input.reading_date,
                    last.reading_date
                )));
            }
            Some(last) => last.reading_value,
            None => input.reading_value,
        };

        let consumption = input
            .consumption(previous_value, meter.multiplier)
            .ok_or_else(|| {
                AppError::BadRequest(anyhow::anyhow!(
                    "Reading {} is lower than the previous reading {}",
                    input.reading_value,
                    previous_value
                ))
            })?;

        let reading = sqlx::query_as::<_, MeterReading>(concat!(
            "INSERT INTO meter_readings (reading_id, meter_id, reading_value, previous_value, consumption, reading_date, reading_source) ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING ",
            reading_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(input.meter_id)
        .bind(input.reading_value)
        .bind(previous_value)
        .bind(consumption)
        .bind(input.reading_date)
        .bind(input.reading_source.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("insert reading", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit transaction", e))?;

        timer.observe_duration();
        info!(reading_id = %reading.reading_id, consumption = %consumption, "Meter reading recorded");
        Ok(reading)
    }

    #[instrument(skip(self), fields(meter_id = %meter_id))]
    pub async fn list_readings(
        &self,
        meter_id: Uuid,
        page: &PageRequest,
    ) -> Result<(Vec<MeterReading>, i64), AppError> {
        self.require("meters", "meter_id", meter_id, "Meter").await?;
        self.fetch_page(
            "list_readings",
            reading_columns!(),
            "meter_readings",
            move |qb| {
                qb.push(" AND meter_id = ").push_bind(meter_id);
            },
            page,
        )
        .await
    }

    // =========================================================================
    // Bill Operations
    // =========================================================================

    /// Compute totals and insert the bill with its tax lines.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id, meter_id = %input.meter_id))]
    pub async fn create_bill(&self, input: &CreateBill) -> Result<(Bill, Vec<BillTax>), AppError> {
        let owner = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT c.customer_id
            FROM meters m
            JOIN service_connections c ON c.connection_id = m.connection_id
            WHERE m.meter_id = $1
            "#,
        )
        .bind(input.meter_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("resolve meter owner", e))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Meter {} not found", input.meter_id)))?;

        if owner != input.customer_id {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Meter {} does not belong to customer {}",
                input.meter_id,
                input.customer_id
            )));
        }

        let totals: BillTotals = calculate_bill_total(&BillCharges::from(input));
        let status = BillStatus::initial(totals.total_amount);

        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_bill"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        let bill = sqlx::query_as::<_, Bill>(concat!(
            "INSERT INTO bills (bill_id, customer_id, meter_id, billing_period_start, billing_period_end, ",
            "energy_charge_amount, fixed_charge_amount, subsidy_amount, solar_export_credit, tax_amount, ",
            "total_amount, amount_paid, due_date, bill_status) ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0, $12, $13) RETURNING ",
            bill_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(input.customer_id)
        .bind(input.meter_id)
        .bind(input.billing_period_start)
        .bind(input.billing_period_end)
        .bind(input.energy_charge_amount)
        .bind(input.fixed_charge_amount)
        .bind(input.subsidy_amount)
        .bind(input.solar_export_credit)
        .bind(totals.tax_amount)
        .bind(totals.total_amount)
        .bind(input.due_date)
        .bind(status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("create bill", e))?;

        let mut taxes = Vec::with_capacity(input.taxes.len());
        for (i, (tax, amount)) in input.taxes.iter().zip(&totals.tax_lines).enumerate() {
            let row = sqlx::query_as::<_, BillTax>(
                r#"
                INSERT INTO bill_taxes (bill_tax_id, bill_id, tax_name, rate_percent_applied, taxable_base_amount, tax_amount, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING bill_tax_id, bill_id, tax_name, rate_percent_applied, taxable_base_amount, tax_amount, sort_order
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(bill.bill_id)
            .bind(&tax.tax_name)
            .bind(tax.rate_percent_applied)
            .bind(tax.taxable_base_amount)
            .bind(*amount)
            .bind(i as i32)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| db_error("insert bill tax", e))?;
            taxes.push(row);
        }

        tx.commit()
            .await
            .map_err(|e| db_error("commit transaction", e))?;

        timer.observe_duration();
        info!(
            bill_id = %bill.bill_id,
            total_amount = %bill.total_amount,
            status = %bill.bill_status,
            "Bill created"
        );
        Ok((bill, taxes))
    }

    #[instrument(skip(self), fields(bill_id = %bill_id))]
    pub async fn get_bill(&self, bill_id: Uuid) -> Result<Bill, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_bill"])
            .start_timer();

        let bill = sqlx::query_as::<_, Bill>(concat!(
            "SELECT ",
            bill_columns!(),
            " FROM bills WHERE bill_id = $1"
        ))
        .bind(bill_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get bill", e))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Bill {} not found", bill_id)))?;

        timer.observe_duration();
        Ok(bill)
    }

    #[instrument(skip(self), fields(bill_id = %bill_id))]
    pub async fn get_bill_taxes(&self, bill_id: Uuid) -> Result<Vec<BillTax>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_bill_taxes"])
            .start_timer();

        let taxes = sqlx::query_as::<_, BillTax>(
            r#"
            SELECT bill_tax_id, bill_id, tax_name, rate_percent_applied, taxable_base_amount, tax_amount, sort_order
            FROM bill_taxes
            WHERE bill_id = $1
            ORDER BY sort_order
            "#,
        )
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("get bill taxes", e))?;

        timer.observe_duration();
        Ok(taxes)
    }

    #[instrument(skip(self))]
    pub async fn list_bills(
        &self,
        filter: &ListBillsFilter,
        page: &PageRequest,
    ) -> Result<(Vec<Bill>, i64), AppError> {
        let filter = filter.clone();
        let collectable: Vec<&'static str> = [BillStatus::Pending, BillStatus::Partial, BillStatus::Overdue]
            .iter()
            .map(|s| s.as_str())
            .collect();

        self.fetch_page(
            "list_bills",
            bill_columns!(),
            "bills",
            move |qb| {
                if let Some(customer_id) = filter.customer_id {
                    qb.push(" AND customer_id = ").push_bind(customer_id);
                }
                if let Some(meter_id) = filter.meter_id {
                    qb.push(" AND meter_id = ").push_bind(meter_id);
                }
                if let Some(status) = filter.status {
                    qb.push(" AND bill_status = ").push_bind(status.as_str());
                }
                if let Some(as_of) = filter.overdue_as_of {
                    qb.push(" AND bill_status = ANY(")
                        .push_bind(collectable.clone())
                        .push(") AND due_date < ")
                        .push_bind(as_of);
                }
            },
            page,
        )
        .await
    }

    /// Count and sums per status, optionally for one customer.
    #[instrument(skip(self))]
    pub async fn bill_summary(
        &self,
        customer_id: Option<Uuid>,
    ) -> Result<Vec<BillStatusTotals>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["bill_summary"])
            .start_timer();

        let rows = sqlx::query_as::<_, BillStatusTotals>(
            r#"
            SELECT bill_status,
                   COUNT(*) AS bill_count,
                   COALESCE(SUM(total_amount), 0) AS total_amount,
                   COALESCE(SUM(amount_paid), 0) AS amount_paid
            FROM bills
            WHERE ($1::uuid IS NULL OR customer_id = $1)
            GROUP BY bill_status
            ORDER BY bill_status
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("summarize bills", e))?;

        timer.observe_duration();
        Ok(rows)
    }

    /// Move every PENDING/PARTIAL bill due before `today` to OVERDUE.
    #[instrument(skip(self), fields(today = %today))]
    pub async fn mark_overdue(&self, today: NaiveDate) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_overdue"])
            .start_timer();

        let eligible: Vec<&'static str> = [BillStatus::Pending, BillStatus::Partial]
            .into_iter()
            .filter(|s| s.apply(BillAction::MarkOverdue).is_ok())
            .map(|s| s.as_str())
            .collect();

        let result = sqlx::query(
            r#"
            UPDATE bills
            SET bill_status = $1, version = version + 1, updated_utc = NOW()
            WHERE bill_status = ANY($2) AND due_date < $3
            "#,
        )
        .bind(BillStatus::Overdue.as_str())
        .bind(eligible)
        .bind(today)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("mark bills overdue", e))?;

        timer.observe_duration();
        let count = result.rows_affected();
        info!(count = count, "Overdue sweep completed");
        Ok(count)
    }

    /// Void an unpaid bill.
    #[instrument(skip(self), fields(bill_id = %bill_id))]
    pub async fn void_bill(&self, bill_id: Uuid) -> Result<Bill, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["void_bill"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        let bill = sqlx::query_as::<_, Bill>(concat!(
            "SELECT ",
            bill_columns!(),
            " FROM bills WHERE bill_id = $1 FOR UPDATE"
        ))
        .bind(bill_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("lock bill", e))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Bill {} not found", bill_id)))?;

        let to = bill.status()?.apply(BillAction::Void)?;
        if bill.amount_paid > Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Bill {} already has payments and cannot be voided",
                bill_id
            )));
        }

        let updated = sqlx::query_as::<_, Bill>(concat!(
            "UPDATE bills SET bill_status = $1, version = version + 1, updated_utc = NOW() ",
            "WHERE bill_id = $2 AND version = $3 RETURNING ",
            bill_columns!()
        ))
        .bind(to.as_str())
        .bind(bill_id)
        .bind(bill.version)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("void bill", e))?
        .ok_or_else(|| {
            AppError::Conflict(anyhow::anyhow!("Bill {} was modified concurrently", bill_id))
        })?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit transaction", e))?;

        timer.observe_duration();
        info!("Bill voided");
        Ok(updated)
    }

    // =========================================================================
    // Payment Operations
    // =========================================================================

    /// Allocate one cashier payment over the selected bills in a single
    /// transaction. Bills are locked, allocated in selection order and
    /// updated under a version check.
    #[instrument(
        skip(self, input, receipt_prefix),
        fields(
            customer_id = %input.customer_id,
            payment_method = input.payment_method.as_str(),
            bill_count = input.bill_ids.len()
        )
    )]
    pub async fn record_payment(
        &self,
        input: &RecordPayment,
        receipt_prefix: &str,
    ) -> Result<RecordedPayment, AppError> {
        validate_payment_input(
            &input.bill_ids,
            input.payment_amount,
            input.payment_method,
            input.transaction_ref.as_deref(),
        )?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_payment"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        // Lock in id order so concurrent payments never deadlock.
        let locked = sqlx::query_as::<_, Bill>(concat!(
            "SELECT ",
            bill_columns!(),
            " FROM bills WHERE bill_id = ANY($1) ORDER BY bill_id FOR UPDATE"
        ))
        .bind(&input.bill_ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| db_error("lock bills", e))?;

        let mut selected = Vec::with_capacity(input.bill_ids.len());
        for bill_id in &input.bill_ids {
            let bill = locked
                .iter()
                .find(|b| b.bill_id == *bill_id && b.customer_id == input.customer_id)
                .ok_or_else(|| {
                    AppError::NotFound(anyhow::anyhow!(
                        "Bill {} not found for customer {}",
                        bill_id,
                        input.customer_id
                    ))
                })?;
            selected.push(bill);
        }

        let outstanding = selected
            .iter()
            .map(|b| OutstandingBill::try_from(*b))
            .collect::<Result<Vec<_>, _>>()?;
        let plan = allocate_payment(input.payment_amount, &outstanding)?;
        let receipt = receipt_number(receipt_prefix, input.payment_date);

        let mut payments = Vec::new();
        for (allocation, bill) in plan.allocations.iter().zip(&selected) {
            if allocation.allocated_amount.is_zero() {
                continue;
            }

            let to = bill.status()?.apply(BillAction::ApplyPayment {
                outstanding_after: allocation.outstanding_after,
            })?;

            let result = sqlx::query(
                r#"
                UPDATE bills
                SET amount_paid = amount_paid + $1, bill_status = $2, version = version + 1, updated_utc = NOW()
                WHERE bill_id = $3 AND version = $4
                "#,
            )
            .bind(allocation.allocated_amount)
            .bind(to.as_str())
            .bind(bill.bill_id)
            .bind(bill.version)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("apply payment to bill", e))?;

            if result.rows_affected() == 0 {
                warn!(bill_id = %bill.bill_id, "Bill version changed during payment");
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Bill {} was modified concurrently",
                    bill.bill_id
                )));
            }

            let payment = sqlx::query_as::<_, Payment>(concat!(
                "INSERT INTO payments (payment_id, customer_id, bill_id, receipt_number, payment_amount, ",
                "payment_method, payment_date, transaction_ref, notes, recorded_by) ",
                "VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING ",
                payment_columns!()
            ))
            .bind(Uuid::new_v4())
            .bind(input.customer_id)
            .bind(bill.bill_id)
            .bind(&receipt)
            .bind(allocation.allocated_amount)
            .bind(input.payment_method.as_str())
            .bind(input.payment_date)
            .bind(&input.transaction_ref)
            .bind(&input.notes)
            .bind(&input.recorded_by)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| db_error("insert payment", e))?;

            payments.push(payment);
        }

        tx.commit()
            .await
            .map_err(|e| db_error("commit transaction", e))?;

        timer.observe_duration();
        info!(
            receipt_number = %receipt,
            total_allocated = %plan.total_allocated,
            excess_amount = %plan.excess_amount,
            "Payment recorded"
        );

        Ok(RecordedPayment {
            receipt_number: receipt,
            plan,
            payments,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_payments(
        &self,
        filter: &ListPaymentsFilter,
        page: &PageRequest,
    ) -> Result<(Vec<Payment>, i64), AppError> {
        let filter = filter.clone();
        self.fetch_page(
            "list_payments",
            payment_columns!(),
            "payments",
            move |qb| {
                if let Some(customer_id) = filter.customer_id {
                    qb.push(" AND customer_id = ").push_bind(customer_id);
                }
                if let Some(bill_id) = filter.bill_id {
                    qb.push(" AND bill_id = ").push_bind(bill_id);
                }
                if let Some(method) = filter.payment_method {
                    qb.push(" AND payment_method = ").push_bind(method.as_str());
                }
                if let Some(start) = filter.start_date {
                    qb.push(" AND payment_date >= ").push_bind(start);
                }
                if let Some(end) = filter.end_date {
                    qb.push(" AND payment_date <= ").push_bind(end);
                }
            },
            page,
        )
        .await
    }

    /// Method and amount of every payment dated within `[start, end]`.
    #[instrument(skip(self), fields(start = %start, end = %end))]
    pub async fn collected_payments(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CollectedPayment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["collected_payments"])
            .start_timer();

        let rows = sqlx::query_as::<_, MethodAmountRow>(
            r#"
            SELECT payment_method, payment_amount
            FROM payments
            WHERE payment_date BETWEEN $1 AND $2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("load collected payments", e))?;

        timer.observe_duration();

        rows.into_iter()
            .map(|row| {
                let payment_method = row
                    .payment_method
                    .parse::<PaymentMethod>()
                    .map_err(|e| AppError::InternalError(e.into()))?;
                Ok(CollectedPayment {
                    payment_method,
                    amount: row.payment_amount,
                })
            })
            .collect()
    }

    // =========================================================================
    // Complaint Operations
    // =========================================================================

    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_complaint(&self, input: &CreateComplaint) -> Result<Complaint, AppError> {
        self.require("customers", "customer_id", input.customer_id, "Customer")
            .await?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_complaint"])
            .start_timer();

        let complaint = sqlx::query_as::<_, Complaint>(concat!(
            "INSERT INTO complaints (complaint_id, customer_id, complaint_type, description) ",
            "VALUES ($1, $2, $3, $4) RETURNING ",
            complaint_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(input.customer_id)
        .bind(&input.complaint_type)
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create complaint", e))?;

        timer.observe_duration();
        info!(complaint_id = %complaint.complaint_id, "Complaint created");
        Ok(complaint)
    }

    #[instrument(skip(self), fields(complaint_id = %complaint_id))]
    pub async fn get_complaint(&self, complaint_id: Uuid) -> Result<Complaint, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_complaint"])
            .start_timer();

        let complaint = sqlx::query_as::<_, Complaint>(concat!(
            "SELECT ",
            complaint_columns!(),
            " FROM complaints WHERE complaint_id = $1"
        ))
        .bind(complaint_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get complaint", e))?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Complaint {} not found", complaint_id))
        })?;

        timer.observe_duration();
        Ok(complaint)
    }

    #[instrument(skip(self))]
    pub async fn list_complaints(
        &self,
        filter: &ListComplaintsFilter,
        page: &PageRequest,
    ) -> Result<(Vec<Complaint>, i64), AppError> {
        let filter = filter.clone();
        self.fetch_page(
            "list_complaints",
            complaint_columns!(),
            "complaints",
            move |qb| {
                if let Some(status) = filter.status {
                    qb.push(" AND status = ").push_bind(status.as_str());
                }
                if let Some(customer_id) = filter.customer_id {
                    qb.push(" AND customer_id = ").push_bind(customer_id);
                }
                if let Some(employee_id) = filter.assigned_employee_id {
                    qb.push(" AND assigned_employee_id = ").push_bind(employee_id);
                }
                if let Some(complaint_type) = &filter.complaint_type {
                    qb.push(" AND complaint_type = ")
                        .push_bind(complaint_type.clone());
                }
            },
            page,
        )
        .await
    }

    #[instrument(skip(self, action), fields(complaint_id = %complaint_id))]
    pub async fn transition_complaint(
        &self,
        complaint_id: Uuid,
        action: ComplaintAction,
    ) -> Result<Complaint, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["transition_complaint"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        let current = sqlx::query_as::<_, Complaint>(concat!(
            "SELECT ",
            complaint_columns!(),
            " FROM complaints WHERE complaint_id = $1 FOR UPDATE"
        ))
        .bind(complaint_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("lock complaint", e))?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Complaint {} not found", complaint_id))
        })?;

        let update = current.transition(action, Utc::now())?;

        let updated = sqlx::query_as::<_, Complaint>(concat!(
            "UPDATE complaints SET status = $1, assigned_employee_id = $2, resolution_notes = $3, ",
            "resolved_date = $4, resolution_time_hours = $5, updated_utc = NOW() ",
            "WHERE complaint_id = $6 RETURNING ",
            complaint_columns!()
        ))
        .bind(update.status.as_str())
        .bind(update.assigned_employee_id)
        .bind(&update.resolution_notes)
        .bind(update.resolved_date)
        .bind(update.resolution_time_hours)
        .bind(complaint_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("update complaint", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit transaction", e))?;

        timer.observe_duration();
        info!(from = %current.status, to = %updated.status, "Complaint status changed");
        Ok(updated)
    }

    // =========================================================================
    // Work Order Operations
    // =========================================================================

    #[instrument(skip(self, input), fields(work_order_type = %input.work_order_type))]
    pub async fn create_work_order(&self, input: &CreateWorkOrder) -> Result<WorkOrder, AppError> {
        if let Some(connection_id) = input.connection_id {
            self.require(
                "service_connections",
                "connection_id",
                connection_id,
                "Connection",
            )
            .await?;
        }
        if let Some(complaint_id) = input.complaint_id {
            self.require("complaints", "complaint_id", complaint_id, "Complaint")
                .await?;
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_work_order"])
            .start_timer();

        let order = sqlx::query_as::<_, WorkOrder>(concat!(
            "INSERT INTO work_orders (work_order_id, title, description, work_order_type, priority, ",
            "connection_id, complaint_id, status, scheduled_start, scheduled_end) ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING ",
            work_order_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.work_order_type)
        .bind(input.priority.as_str())
        .bind(input.connection_id)
        .bind(input.complaint_id)
        .bind(WorkOrderStatus::Open.as_str())
        .bind(input.scheduled_start)
        .bind(input.scheduled_end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create work order", e))?;

        timer.observe_duration();
        info!(work_order_id = %order.work_order_id, "Work order created");
        Ok(order)
    }

    #[instrument(skip(self), fields(work_order_id = %work_order_id))]
    pub async fn get_work_order(&self, work_order_id: Uuid) -> Result<WorkOrder, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_work_order"])
            .start_timer();

        let order = sqlx::query_as::<_, WorkOrder>(concat!(
            "SELECT ",
            work_order_columns!(),
            " FROM work_orders WHERE work_order_id = $1"
        ))
        .bind(work_order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get work order", e))?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Work order {} not found", work_order_id))
        })?;

        timer.observe_duration();
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn list_work_orders(
        &self,
        filter: &ListWorkOrdersFilter,
        page: &PageRequest,
    ) -> Result<(Vec<WorkOrder>, i64), AppError> {
        let filter = filter.clone();
        self.fetch_page(
            "list_work_orders",
            work_order_columns!(),
            "work_orders",
            move |qb| {
                if let Some(status) = filter.status {
                    qb.push(" AND status = ").push_bind(status.as_str());
                }
                if let Some(priority) = filter.priority {
                    qb.push(" AND priority = ").push_bind(priority.as_str());
                }
                if let Some(employee_id) = filter.assigned_employee_id {
                    qb.push(" AND assigned_employee_id = ").push_bind(employee_id);
                }
                if let Some(connection_id) = filter.connection_id {
                    qb.push(" AND connection_id = ").push_bind(connection_id);
                }
            },
            page,
        )
        .await
    }

    #[instrument(skip(self, notes), fields(work_order_id = %work_order_id, target = target.as_str()))]
    pub async fn transition_work_order(
        &self,
        work_order_id: Uuid,
        target: WorkOrderStatus,
        employee_id: Option<Uuid>,
        notes: Option<String>,
    ) -> Result<WorkOrder, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["transition_work_order"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        let current = sqlx::query_as::<_, WorkOrder>(concat!(
            "SELECT ",
            work_order_columns!(),
            " FROM work_orders WHERE work_order_id = $1 FOR UPDATE"
        ))
        .bind(work_order_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("lock work order", e))?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Work order {} not found", work_order_id))
        })?;

        let update = current.transition(target, employee_id, notes, Utc::now())?;

        let updated = sqlx::query_as::<_, WorkOrder>(concat!(
            "UPDATE work_orders SET status = $1, assigned_employee_id = $2, resolution_notes = $3, ",
            "closed_ts = $4, updated_utc = NOW() WHERE work_order_id = $5 RETURNING ",
            work_order_columns!()
        ))
        .bind(update.status.as_str())
        .bind(update.assigned_employee_id)
        .bind(&update.resolution_notes)
        .bind(update.closed_ts)
        .bind(work_order_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("update work order", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit transaction", e))?;

        timer.observe_duration();
        info!(from = %current.status, to = %updated.status, "Work order status changed");
        Ok(updated)
    }

    #[instrument(skip(self), fields(work_order_id = %work_order_id))]
    pub async fn add_labor(
        &self,
        work_order_id: Uuid,
        employee_id: Uuid,
        hours: Decimal,
        hourly_rate: Decimal,
    ) -> Result<WorkOrderLabor, AppError> {
        self.require("work_orders", "work_order_id", work_order_id, "Work order")
            .await?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["add_labor"])
            .start_timer();

        let labor = sqlx::query_as::<_, WorkOrderLabor>(
            r#"
            INSERT INTO work_order_labor (labor_id, work_order_id, employee_id, hours, hourly_rate_snapshot)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING labor_id, work_order_id, employee_id, hours, hourly_rate_snapshot, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(work_order_id)
        .bind(employee_id)
        .bind(hours)
        .bind(hourly_rate)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("add labor", e))?;

        timer.observe_duration();
        Ok(labor)
    }

    #[instrument(skip(self), fields(work_order_id = %work_order_id))]
    pub async fn add_item_usage(
        &self,
        work_order_id: Uuid,
        item_name: &str,
        quantity: Decimal,
        item_cost_amount: Decimal,
    ) -> Result<WorkOrderItemUsage, AppError> {
        self.require("work_orders", "work_order_id", work_order_id, "Work order")
            .await?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["add_item_usage"])
            .start_timer();

        let item = sqlx::query_as::<_, WorkOrderItemUsage>(
            r#"
            INSERT INTO work_order_item_usage (item_usage_id, work_order_id, item_name, quantity, item_cost_amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING item_usage_id, work_order_id, item_name, quantity, item_cost_amount, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(work_order_id)
        .bind(item_name)
        .bind(quantity)
        .bind(item_cost_amount)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("add item usage", e))?;

        timer.observe_duration();
        Ok(item)
    }

    #[instrument(skip(self), fields(work_order_id = %work_order_id))]
    pub async fn get_work_order_lines(
        &self,
        work_order_id: Uuid,
    ) -> Result<(Vec<WorkOrderLabor>, Vec<WorkOrderItemUsage>), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_work_order_lines"])
            .start_timer();

        let labor = sqlx::query_as::<_, WorkOrderLabor>(
            r#"
            SELECT labor_id, work_order_id, employee_id, hours, hourly_rate_snapshot, created_utc
            FROM work_order_labor
            WHERE work_order_id = $1
            ORDER BY created_utc
            "#,
        )
        .bind(work_order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("get labor", e))?;

        let items = sqlx::query_as::<_, WorkOrderItemUsage>(
            r#"
            SELECT item_usage_id, work_order_id, item_name, quantity, item_cost_amount, created_utc
            FROM work_order_item_usage
            WHERE work_order_id = $1
            ORDER BY created_utc
            "#,
        )
        .bind(work_order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("get item usage", e))?;

        timer.observe_duration();
        Ok((labor, items))
    }

    /// Status, schedule and cost subtotals of every work order.
    #[instrument(skip(self))]
    pub async fn work_order_cost_rows(&self) -> Result<Vec<WorkOrderCostRow>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["work_order_cost_rows"])
            .start_timer();

        let rows = sqlx::query_as::<_, WorkOrderCostRow>(
            r#"
            SELECT w.status,
                   w.scheduled_start,
                   w.scheduled_end,
                   COALESCE((SELECT SUM(l.hours * l.hourly_rate_snapshot)
                             FROM work_order_labor l
                             WHERE l.work_order_id = w.work_order_id), 0) AS labor_cost,
                   COALESCE((SELECT SUM(i.item_cost_amount)
                             FROM work_order_item_usage i
                             WHERE i.work_order_id = w.work_order_id), 0) AS item_cost
            FROM work_orders w
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("load work order costs", e))?;

        timer.observe_duration();
        Ok(rows)
    }
}
