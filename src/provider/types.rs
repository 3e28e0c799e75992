//! Raw response shapes of the provider's REST API.
//!
//! Everything is lenient: absent arrays deserialize as empty and absent
//! summaries as `None`, so a card without international activity parses fine.

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// Product code of credit cards in the products listing.
pub const CREDIT_CARD_PRODUCT_CODE: &str = "TNM";

/// Unbilled rows with this origin are national; anything else is international.
pub const NATIONAL_ORIGIN: &str = "NAC";

/// Accept either a JSON string or a JSON number and keep it as text.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductsResponse {
    #[serde(default)]
    pub productos: Vec<Product>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub codigo: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub mascara: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingDatesResponse {
    #[serde(default, rename = "listaNacional")]
    pub lista_nacional: Vec<BillingDateEntry>,
    #[serde(default, rename = "listaInternacional")]
    pub lista_internacional: Vec<BillingDateEntry>,
    #[serde(default, rename = "numeroCuenta", deserialize_with = "string_or_number")]
    pub numero_cuenta: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingDateEntry {
    #[serde(default, rename = "fechaFacturacion")]
    pub fecha_facturacion: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnbilledResponse {
    #[serde(default, rename = "listaMovNoFactur")]
    pub lista_mov_no_factur: Vec<UnbilledRow>,
}

/// One unbilled movement as published by the provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UnbilledRow {
    #[serde(rename = "montoCompra")]
    pub monto_compra: Decimal,
    #[serde(default, rename = "origenTransaccion")]
    pub origen_transaccion: String,
    #[serde(default, rename = "fechaTransaccion")]
    pub fecha_transaccion: String,
    #[serde(default, rename = "glosaTransaccion")]
    pub glosa_transaccion: String,
    #[serde(default, rename = "numeroCuotas", deserialize_with = "string_or_number")]
    pub numero_cuotas: String,
    #[serde(
        default,
        rename = "numeroTotalCuotas",
        deserialize_with = "string_or_number"
    )]
    pub numero_total_cuotas: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BilledStatementResponse {
    #[serde(default, rename = "seccionOperaciones")]
    pub seccion_operaciones: Option<StatementSection>,
    #[serde(default, rename = "seccionComprasEnCuotas")]
    pub seccion_compras_en_cuotas: Option<StatementSection>,
    #[serde(default, rename = "montoFacturado")]
    pub monto_facturado: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementSection {
    #[serde(default, rename = "transaccionesTarjetas")]
    pub transacciones_tarjetas: Vec<BilledRow>,
}

/// One row of a billed statement section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BilledRow {
    #[serde(rename = "montoTransaccion")]
    pub monto_transaccion: Decimal,
    #[serde(default, rename = "fechaTransaccion")]
    pub fecha_transaccion: String,
    #[serde(default)]
    pub descripcion: String,
    /// `"current/total"`, e.g. `"2/6"`.
    #[serde(default, deserialize_with = "string_or_number")]
    pub cuotas: String,
    /// `Some(false)` marks a real movement. Subtotal rows are flagged `true`;
    /// rows without the flag are not trusted as movements either.
    #[serde(default)]
    pub totales: Option<bool>,
}

/// A billed statement for one card, period and domain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BilledStatement {
    pub operations: Vec<BilledRow>,
    pub installment_purchases: Vec<BilledRow>,
    /// Coarse statement total in the statement's own currency.
    pub billed_amount: Decimal,
}

impl From<BilledStatementResponse> for BilledStatement {
    fn from(value: BilledStatementResponse) -> Self {
        Self {
            operations: value
                .seccion_operaciones
                .map(|s| s.transacciones_tarjetas)
                .unwrap_or_default(),
            installment_purchases: value
                .seccion_compras_en_cuotas
                .map(|s| s.transacciones_tarjetas)
                .unwrap_or_default(),
            billed_amount: value.monto_facturado.unwrap_or_default(),
        }
    }
}

/// Parse the date formats seen in provider payloads.
///
/// Accepts `YYYY-MM-DD`, `DD/MM/YYYY` and RFC 3339 timestamps.
pub fn parse_provider_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%d/%m/%Y") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    // Timestamps without an offset, e.g. "2024-05-20T00:00:00".
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Parse the exchange-rate indicator, which may come as a number or as text
/// with a decimal comma.
pub fn parse_rate_value(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => n.to_string().parse().ok(),
        serde_json::Value::String(s) => {
            let cleaned = s.trim().replace('.', "").replace(',', ".");
            let candidate = if s.contains(',') { cleaned } else { s.trim().to_string() };
            candidate.parse().ok()
        }
        _ => None,
    }
}
