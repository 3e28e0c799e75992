//! Provider API client using raw HTTP requests.
//!
//! Uses session cookies captured by a login to call the provider's internal
//! REST endpoints for cards, billing dates, movements and the USD rate.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::credentials::SessionData;
use crate::models::{BillingDate, BillingDates, BillingPeriod, CardAccount, Id, MovementKind};

use super::types::{
    parse_provider_date, parse_rate_value, BillingDateEntry, BillingDatesResponse,
    BilledStatement, BilledStatementResponse, ProductsResponse, UnbilledResponse, UnbilledRow,
    CREDIT_CARD_PRODUCT_CODE,
};
use super::{DataSource, FetchError, RetryPolicy};

const PRODUCTS_PATH: &str =
    "/bff-ppersonas-prd-selector/productos/obtenerProductos?incluirTarjetas=true";
const BILLING_DATES_PATH: &str = "/tarjetas/estadocuenta/fechas-facturacion";
const UNBILLED_PATH: &str = "/tarjeta-credito-digital/movimientos-no-facturados";
const USD_RATE_PATH: &str = "/home/indices-financieros";
const NATIONAL_BILLED_PATH: &str = "/tarjetas/estadocuenta/nacional/resumen-por-fecha";
const INTERNATIONAL_BILLED_PATH: &str = "/tarjetas/estadocuenta/internacional/resumen-por-fecha";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CardRequest<'a> {
    id_tarjeta: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatementRequest<'a> {
    id_tarjeta: &'a str,
    fecha_facturacion: &'a str,
    numero_cuenta: &'a str,
}

/// Provider client using cookie-based authentication.
pub struct BankClient {
    client: Client,
    base_url: String,
    session: SessionData,
    retry: RetryPolicy,
}

impl BankClient {
    /// Create a new client with session data.
    pub fn new(session: SessionData, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/145.0.0.0 Safari/537.36")
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            retry: RetryPolicy::none(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<T, FetchError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                endpoint: endpoint.to_string(),
                status,
                body: truncate(&body, 500),
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|err| {
            FetchError::parse(endpoint, format!("{err}: {}", truncate(&body, 200)))
        })
    }

    /// Make an authenticated GET request.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        self.retry
            .run(path, || async move {
                let response = self
                    .client
                    .get(self.url(path))
                    .header("accept", "application/json, text/plain, */*")
                    .header("cookie", self.session.cookie_header())
                    .send()
                    .await
                    .map_err(|source| FetchError::Transport {
                        endpoint: path.to_string(),
                        source,
                    })?;
                Self::read_json(path, response).await
            })
            .await
    }

    /// Make an authenticated POST request with a JSON body.
    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, FetchError> {
        self.retry
            .run(path, || async move {
                let response = self
                    .client
                    .post(self.url(path))
                    .header("accept", "application/json, text/plain, */*")
                    .header("cookie", self.session.cookie_header())
                    .json(body)
                    .send()
                    .await
                    .map_err(|source| FetchError::Transport {
                        endpoint: path.to_string(),
                        source,
                    })?;
                Self::read_json(path, response).await
            })
            .await
    }
}

fn truncate(body: &str, max: usize) -> String {
    body.chars().take(max).collect()
}

/// Parse billing dates, keeping the provider's text to echo back verbatim.
fn parse_dates(entries: Vec<BillingDateEntry>) -> Result<Vec<BillingDate>, FetchError> {
    entries
        .into_iter()
        .map(|entry| match parse_provider_date(&entry.fecha_facturacion) {
            Some(date) => Ok(BillingDate::new(date, entry.fecha_facturacion)),
            None => Err(FetchError::parse(
                BILLING_DATES_PATH,
                format!("unrecognized billing date {:?}", entry.fecha_facturacion),
            )),
        })
        .collect()
}

#[async_trait]
impl DataSource for BankClient {
    async fn list_cards(&self) -> Result<Vec<CardAccount>> {
        let response: ProductsResponse = self.get(PRODUCTS_PATH).await?;

        let cards = response
            .productos
            .into_iter()
            .filter(|product| product.codigo == CREDIT_CARD_PRODUCT_CODE)
            .map(|product| {
                let display_name = product.descripcion.unwrap_or_default();
                let masked_number = product.mascara.unwrap_or_default();
                CardAccount::new(Id::from_string(product.id), display_name, masked_number)
            })
            .collect();

        Ok(cards)
    }

    async fn billing_dates(&self, card_id: &Id) -> Result<BillingDates> {
        let response: BillingDatesResponse = self
            .post(
                BILLING_DATES_PATH,
                &CardRequest {
                    id_tarjeta: card_id.as_str(),
                },
            )
            .await?;

        Ok(BillingDates {
            national: parse_dates(response.lista_nacional)?,
            international: parse_dates(response.lista_internacional)?,
            account_number: response.numero_cuenta,
        })
    }

    async fn unbilled_movements(&self, card_id: &Id) -> Result<Vec<UnbilledRow>> {
        let response: UnbilledResponse = self
            .post(
                UNBILLED_PATH,
                &CardRequest {
                    id_tarjeta: card_id.as_str(),
                },
            )
            .await?;
        Ok(response.lista_mov_no_factur)
    }

    async fn billed_statement(
        &self,
        period: &BillingPeriod,
        domain: MovementKind,
    ) -> Result<BilledStatement> {
        let (path, date) = match domain {
            MovementKind::National => (NATIONAL_BILLED_PATH, &period.billing_date),
            MovementKind::International => (INTERNATIONAL_BILLED_PATH, period.international_date()),
        };

        let response: BilledStatementResponse = self
            .post(
                path,
                &StatementRequest {
                    id_tarjeta: period.card_id.as_str(),
                    fecha_facturacion: &date.raw,
                    numero_cuenta: &period.account_number,
                },
            )
            .await?;

        Ok(response.into())
    }

    async fn usd_rate(&self) -> Result<Decimal> {
        let response: serde_json::Value = self.get(USD_RATE_PATH).await?;
        let raw = response
            .get("datosObservados")
            .ok_or_else(|| FetchError::parse(USD_RATE_PATH, "missing datosObservados"))?;
        let rate = parse_rate_value(raw).ok_or_else(|| {
            FetchError::parse(USD_RATE_PATH, format!("unrecognized USD rate {raw}"))
        })?;
        if rate <= Decimal::ZERO {
            return Err(FetchError::parse(USD_RATE_PATH, format!("non-positive USD rate {rate}")).into());
        }
        Ok(rate)
    }
}
