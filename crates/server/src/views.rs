//! Mapping between engine values and API bodies.

use api_types::{
    BulkEntry, BulkItemResult, BulkResponse,
    invoice::{self as api_invoice, InvoiceView, LineItemNew, LineItemView},
    payment::PaymentView,
    recurring::{self as api_recurring, TemplateItemView, TemplateView},
};
use engine::{
    BulkReport, Cadence, EngineError, Invoice, InvoiceStatus, LineItemInput, MAX_BULK_ITEMS, Payment,
    RecurringTemplate, money::format_money,
};

use crate::ServerError;

pub fn map_status(status: InvoiceStatus) -> api_invoice::InvoiceStatus {
    match status {
        InvoiceStatus::Draft => api_invoice::InvoiceStatus::Draft,
        InvoiceStatus::Scheduled => api_invoice::InvoiceStatus::Scheduled,
        InvoiceStatus::Sent => api_invoice::InvoiceStatus::Sent,
        InvoiceStatus::Viewed => api_invoice::InvoiceStatus::Viewed,
        InvoiceStatus::Partial => api_invoice::InvoiceStatus::Partial,
        InvoiceStatus::Paid => api_invoice::InvoiceStatus::Paid,
        InvoiceStatus::Overdue => api_invoice::InvoiceStatus::Overdue,
        InvoiceStatus::Cancelled => api_invoice::InvoiceStatus::Cancelled,
        InvoiceStatus::Refunded => api_invoice::InvoiceStatus::Refunded,
    }
}

pub fn parse_status(status: api_invoice::InvoiceStatus) -> InvoiceStatus {
    match status {
        api_invoice::InvoiceStatus::Draft => InvoiceStatus::Draft,
        api_invoice::InvoiceStatus::Scheduled => InvoiceStatus::Scheduled,
        api_invoice::InvoiceStatus::Sent => InvoiceStatus::Sent,
        api_invoice::InvoiceStatus::Viewed => InvoiceStatus::Viewed,
        api_invoice::InvoiceStatus::Partial => InvoiceStatus::Partial,
        api_invoice::InvoiceStatus::Paid => InvoiceStatus::Paid,
        api_invoice::InvoiceStatus::Overdue => InvoiceStatus::Overdue,
        api_invoice::InvoiceStatus::Cancelled => InvoiceStatus::Cancelled,
        api_invoice::InvoiceStatus::Refunded => InvoiceStatus::Refunded,
    }
}

pub fn map_cadence(cadence: Cadence) -> api_recurring::Cadence {
    match cadence {
        Cadence::Weekly => api_recurring::Cadence::Weekly,
        Cadence::Biweekly => api_recurring::Cadence::Biweekly,
        Cadence::Monthly => api_recurring::Cadence::Monthly,
        Cadence::Quarterly => api_recurring::Cadence::Quarterly,
        Cadence::Yearly => api_recurring::Cadence::Yearly,
    }
}

pub fn parse_cadence(cadence: api_recurring::Cadence) -> Cadence {
    match cadence {
        api_recurring::Cadence::Weekly => Cadence::Weekly,
        api_recurring::Cadence::Biweekly => Cadence::Biweekly,
        api_recurring::Cadence::Monthly => Cadence::Monthly,
        api_recurring::Cadence::Quarterly => Cadence::Quarterly,
        api_recurring::Cadence::Yearly => Cadence::Yearly,
    }
}

pub fn item_inputs(items: Vec<LineItemNew>) -> Vec<LineItemInput> {
    items
        .into_iter()
        .map(|item| LineItemInput::new(item.description, item.quantity, item.unit_price))
        .collect()
}

pub fn invoice_view(invoice: Invoice) -> InvoiceView {
    let balance_due = format_money(invoice.balance_due());
    InvoiceView {
        id: invoice.id,
        number: invoice.number,
        client_id: invoice.client_id,
        bank_account_id: invoice.bank_account_id,
        recurring_template_id: invoice.recurring_template_id,
        issue_date: invoice.issue_date,
        scheduled_at: invoice.scheduled_at,
        status: map_status(invoice.status),
        order_number: invoice.order_number,
        project_number: invoice.project_number,
        notes: invoice.notes,
        subtotal: format_money(invoice.subtotal),
        tax_rate: format_money(invoice.tax_rate),
        tax: format_money(invoice.tax),
        total: format_money(invoice.total),
        amount_paid: format_money(invoice.amount_paid),
        balance_due,
        paid_date: invoice.paid_date,
        sent_at: invoice.sent_at,
        created_at: invoice.created_at,
        updated_at: invoice.updated_at,
        items: invoice
            .items
            .into_iter()
            .map(|item| LineItemView {
                id: item.id,
                description: item.description,
                quantity: format_money(item.quantity),
                unit_price: format_money(item.unit_price),
                amount: format_money(item.amount),
                position: item.position,
            })
            .collect(),
    }
}

pub fn payment_view(payment: Payment) -> PaymentView {
    PaymentView {
        id: payment.id,
        invoice_id: payment.invoice_id,
        amount: format_money(payment.amount),
        paid_on: payment.paid_on,
        method: payment.method,
        created_at: payment.created_at,
    }
}

pub fn template_view(template: RecurringTemplate) -> TemplateView {
    TemplateView {
        id: template.id,
        client_id: template.client_id,
        bank_account_id: template.bank_account_id,
        cadence: map_cadence(template.cadence),
        start_date: template.start_date,
        end_date: template.end_date,
        next_generation_date: template.next_generation_date,
        active: template.active,
        tax_rate: format_money(template.tax_rate),
        notes: template.notes,
        last_generated_at: template.last_generated_at,
        created_at: template.created_at,
        updated_at: template.updated_at,
        items: template
            .items
            .into_iter()
            .map(|item| TemplateItemView {
                id: item.id,
                description: item.description,
                quantity: format_money(item.quantity),
                unit_price: format_money(item.unit_price),
                position: item.position,
            })
            .collect(),
    }
}

fn bulk_error(index: usize, err: EngineError) -> String {
    match err {
        EngineError::SequenceUnavailable(_) | EngineError::Delivery(_) | EngineError::Database(_) => {
            tracing::error!(index, "bulk item failed: {err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

/// Split a bulk request into the commands that decoded and a layout
/// remembering the submitted position of every entry.
pub fn decode_bulk<T, C>(
    entries: Vec<BulkEntry<T>>,
    noun: &str,
    mut to_cmd: impl FnMut(T) -> C,
) -> Result<(Vec<C>, BulkLayout), ServerError> {
    if entries.len() > MAX_BULK_ITEMS {
        return Err(EngineError::Validation(format!(
            "at most {MAX_BULK_ITEMS} {noun} per batch, got {}",
            entries.len()
        ))
        .into());
    }

    let mut cmds = Vec::with_capacity(entries.len());
    let mut layout = BulkLayout {
        positions: Vec::with_capacity(entries.len()),
        failures: Vec::new(),
    };
    for (index, BulkEntry(entry)) in entries.into_iter().enumerate() {
        match entry {
            Ok(item) => {
                layout.positions.push(index);
                cmds.push(to_cmd(item));
            }
            Err(err) => {
                tracing::warn!(index, "bulk entry rejected: {err}");
                layout
                    .failures
                    .push((index, format!("invalid request body: {err}")));
            }
        }
    }
    Ok((cmds, layout))
}

pub struct BulkLayout {
    positions: Vec<usize>,
    failures: Vec<(usize, String)>,
}

impl BulkLayout {
    /// Every entry failed to decode, so there is nothing to hand to the engine.
    pub fn nothing_decoded(&self) -> bool {
        self.positions.is_empty() && !self.failures.is_empty()
    }

    /// Merge the engine report with the decoding failures, in submitted order.
    pub fn respond<T, V>(self, report: BulkReport<T>, view: impl Fn(T) -> V) -> BulkResponse<V> {
        let positions = self.positions;
        let mut results: Vec<BulkItemResult<V>> = report
            .results
            .into_iter()
            .map(|item| {
                let index = positions.get(item.index).copied().unwrap_or(item.index);
                match item.result {
                    Ok(value) => BulkItemResult {
                        index,
                        success: true,
                        data: Some(view(value)),
                        error: None,
                    },
                    Err(err) => BulkItemResult {
                        index,
                        success: false,
                        data: None,
                        error: Some(bulk_error(index, err)),
                    },
                }
            })
            .collect();
        results.extend(self.failures.into_iter().map(|(index, error)| BulkItemResult {
            index,
            success: false,
            data: None,
            error: Some(error),
        }));
        results.sort_by_key(|result| result.index);

        let created = results.iter().filter(|result| result.success).count();
        BulkResponse {
            created,
            failed: results.len() - created,
            results,
        }
    }
}
