//! Statement builders for the dashboard queries.

use sea_query::extension::postgres::PgExpr;
use sea_query::{
    Alias, Asterisk, Cond, Condition, Expr, Func, IntoTableRef, OnConflict, Order, Query,
    SelectStatement, SimpleExpr,
};
use uuid::Uuid;

use crate::storage::schema::{Customers, Invoices, Revenue, Users};
use crate::storage::store::{InvoiceStatus, NewInvoice, ITEMS_PER_PAGE, LATEST_INVOICES};
use crate::storage::Statement;

pub(super) const PAID_TOTAL: &str = "paid";
pub(super) const PENDING_TOTAL: &str = "pending";
pub(super) const TOTAL: &str = "count";

pub(super) fn customers() -> Statement {
    Statement::from_query(
        &Query::select()
            .columns([Customers::Id, Customers::Name])
            .from(Customers::Table)
            .order_by(Customers::Name, Order::Asc)
            .to_owned(),
    )
}

pub(super) fn revenue() -> Statement {
    Statement::from_query(
        &Query::select()
            .columns([Revenue::Month, Revenue::Revenue])
            .from(Revenue::Table)
            .to_owned(),
    )
}

fn invoices_with_customers() -> SelectStatement {
    Query::select()
        .from(Invoices::Table)
        .inner_join(
            Customers::Table,
            Expr::col((Invoices::Table, Invoices::CustomerId))
                .equals((Customers::Table, Customers::Id)),
        )
        .to_owned()
}

pub(super) fn latest_invoices() -> Statement {
    Statement::from_query(
        &invoices_with_customers()
            .column((Invoices::Table, Invoices::Id))
            .column((Invoices::Table, Invoices::Amount))
            .column((Customers::Table, Customers::Name))
            .column((Customers::Table, Customers::Email))
            .column((Customers::Table, Customers::ImageUrl))
            .order_by((Invoices::Table, Invoices::Date), Order::Desc)
            .limit(LATEST_INVOICES)
            .to_owned(),
    )
}

pub(super) fn count<T: IntoTableRef>(table: T) -> Statement {
    Statement::from_query(
        &Query::select()
            .expr_as(Expr::col(Asterisk).count(), Alias::new(TOTAL))
            .from(table)
            .to_owned(),
    )
}

fn total_for(status: InvoiceStatus) -> SimpleExpr {
    let amount = Expr::case(
        Expr::col(Invoices::Status).eq(status.as_str()),
        Expr::col(Invoices::Amount),
    )
    .finally(Expr::val(0));
    Func::coalesce([SimpleExpr::from(Func::sum(amount)), Expr::val(0i64).into()]).into()
}

pub(super) fn invoice_totals() -> Statement {
    Statement::from_query(
        &Query::select()
            .expr_as(total_for(InvoiceStatus::Paid), Alias::new(PAID_TOTAL))
            .expr_as(total_for(InvoiceStatus::Pending), Alias::new(PENDING_TOTAL))
            .from(Invoices::Table)
            .to_owned(),
    )
}

/// Case-insensitive substring match over the searchable invoice columns.
fn search(query: &str) -> Condition {
    let pattern = format!("%{}%", query);
    let as_text = |col: Expr| Expr::expr(col.cast_as(Alias::new("text")));

    Cond::any()
        .add(Expr::col((Customers::Table, Customers::Name)).ilike(&pattern))
        .add(Expr::col((Customers::Table, Customers::Email)).ilike(&pattern))
        .add(as_text(Expr::col((Invoices::Table, Invoices::Amount))).ilike(&pattern))
        .add(as_text(Expr::col((Invoices::Table, Invoices::Date))).ilike(&pattern))
        .add(Expr::col((Invoices::Table, Invoices::Status)).ilike(&pattern))
}

pub(super) fn filtered_invoices(query: &str, page: u64) -> Statement {
    let offset = page.saturating_sub(1) * ITEMS_PER_PAGE;
    Statement::from_query(
        &invoices_with_customers()
            .column((Invoices::Table, Invoices::Id))
            .column((Invoices::Table, Invoices::CustomerId))
            .column((Invoices::Table, Invoices::Amount))
            .column((Invoices::Table, Invoices::Date))
            .column((Invoices::Table, Invoices::Status))
            .column((Customers::Table, Customers::Name))
            .column((Customers::Table, Customers::Email))
            .column((Customers::Table, Customers::ImageUrl))
            .cond_where(search(query))
            .order_by((Invoices::Table, Invoices::Date), Order::Desc)
            .limit(ITEMS_PER_PAGE)
            .offset(offset)
            .to_owned(),
    )
}

pub(super) fn filtered_count(query: &str) -> Statement {
    Statement::from_query(
        &invoices_with_customers()
            .expr_as(Expr::col(Asterisk).count(), Alias::new(TOTAL))
            .cond_where(search(query))
            .to_owned(),
    )
}

pub(super) fn invoice_by_id(id: Uuid) -> Statement {
    Statement::from_query(
        &Query::select()
            .columns([
                Invoices::Id,
                Invoices::CustomerId,
                Invoices::Amount,
                Invoices::Status,
            ])
            .from(Invoices::Table)
            .and_where(Expr::col(Invoices::Id).eq(id))
            .to_owned(),
    )
}

pub(super) fn insert_invoice(id: Uuid, invoice: &NewInvoice, amount: i32) -> Statement {
    Statement::from_query(
        &Query::insert()
            .into_table(Invoices::Table)
            .columns([
                Invoices::Id,
                Invoices::CustomerId,
                Invoices::Amount,
                Invoices::Status,
                Invoices::Date,
            ])
            .values_panic([
                id.into(),
                invoice.customer_id.into(),
                amount.into(),
                invoice.status.as_str().into(),
                invoice.date.into(),
            ])
            .on_conflict(OnConflict::column(Invoices::Id).do_nothing().to_owned())
            .to_owned(),
    )
}

pub(super) fn update_invoice(id: Uuid, invoice: &NewInvoice, amount: i32) -> Statement {
    Statement::from_query(
        &Query::update()
            .table(Invoices::Table)
            .values([
                (Invoices::CustomerId, invoice.customer_id.into()),
                (Invoices::Amount, amount.into()),
                (Invoices::Status, invoice.status.as_str().into()),
            ])
            .and_where(Expr::col(Invoices::Id).eq(id))
            .to_owned(),
    )
}

pub(super) fn delete_invoice(id: Uuid) -> Statement {
    Statement::from_query(
        &Query::delete()
            .from_table(Invoices::Table)
            .and_where(Expr::col(Invoices::Id).eq(id))
            .to_owned(),
    )
}

pub(super) fn user_by_email(email: &str) -> Statement {
    Statement::from_query(
        &Query::select()
            .columns([Users::Id, Users::Name, Users::Email, Users::Password])
            .from(Users::Table)
            .and_where(Expr::col(Users::Email).eq(email))
            .to_owned(),
    )
}
