//! Ticket field reader and writer for the ticketing system.
//!
//! Both operations address a field by its numeric id. Writes replace the
//! whole option list; nothing is merged with what the field held before.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use fieldsync_shared::{ApiClient, FieldOption, FieldSyncError, Result, SyncConfig, TargetField};

/// `{"ticket_field": {...}}` wrapper used by both GET responses and PUT bodies.
#[derive(Debug, Serialize, Deserialize)]
struct TicketFieldEnvelope<T> {
    ticket_field: T,
}

/// PUT body payload: only the option list is sent.
#[derive(Debug, Serialize)]
struct OptionsUpdate<'a> {
    custom_field_options: &'a [FieldOption],
}

/// Serialize the exact request body sent by [`ZendeskClient::write_field`].
///
/// Output is byte-stable for equal input, so it can be hashed to compare runs.
pub fn encode_field_update(options: &[FieldOption]) -> Result<Vec<u8>> {
    let envelope = TicketFieldEnvelope {
        ticket_field: OptionsUpdate {
            custom_field_options: options,
        },
    };
    serde_json::to_vec(&envelope)
        .map_err(|e| FieldSyncError::validation(format!("failed to encode field update: {e}")))
}

fn field_path(field_id: u64) -> String {
    format!("/api/v2/ticket_fields/{field_id}.json")
}

// ---------------------------------------------------------------------------
// ZendeskClient
// ---------------------------------------------------------------------------

/// Client for the ticket field endpoints.
pub struct ZendeskClient {
    api: ApiClient,
}

impl ZendeskClient {
    /// Create a client from the run's configuration.
    pub fn new(config: &SyncConfig) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(&config.zendesk, config.timeout)?,
        })
    }

    /// `GET /api/v2/ticket_fields/{id}.json`
    #[instrument(skip(self))]
    pub async fn fetch_field(&self, field_id: u64) -> Result<TargetField> {
        info!("reading ticket field");
        let envelope: TicketFieldEnvelope<TargetField> =
            self.api.get_json(&field_path(field_id), &[]).await?;
        Ok(envelope.ticket_field)
    }

    /// `PUT /api/v2/ticket_fields/{id}.json` replacing the option list.
    #[instrument(skip(self, options), fields(options = options.len()))]
    pub async fn write_field(&self, field_id: u64, options: &[FieldOption]) -> Result<()> {
        let body = encode_field_update(options)?;
        self.write_field_body(field_id, body).await
    }

    /// PUT a body produced by [`encode_field_update`].
    #[instrument(skip(self, body), fields(bytes = body.len()))]
    pub async fn write_field_body(&self, field_id: u64, body: Vec<u8>) -> Result<()> {
        info!("writing ticket field");
        self.api.put_json_bytes(&field_path(field_id), body).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fieldsync_shared::{Credentials, ServiceEndpoint};
    use url::Url;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_config(zendesk_uri: &str) -> SyncConfig {
        let endpoint = |uri: &str| ServiceEndpoint {
            base_url: Url::parse(uri).unwrap(),
            credentials: Credentials {
                user: "agent@acme.test/token".into(),
                secret: "zd-token".into(),
            },
        };
        SyncConfig {
            harvest: endpoint("http://127.0.0.1:9"),
            zendesk: endpoint(zendesk_uri),
            client_field_id: 29557247,
            project_field_id: 29084117,
            client_concurrency: 5,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn update_body_shape() {
        let options = vec![
            FieldOption::new("Acme", "client-10-acme"),
            FieldOption::new("Other", "client-other"),
        ];
        let body = encode_field_update(&options).unwrap();
        assert_eq!(
            String::from_utf8(body).unwrap(),
            r#"{"ticket_field":{"custom_field_options":[{"name":"Acme","value":"client-10-acme"},{"name":"Other","value":"client-other"}]}}"#
        );
    }

    #[tokio::test]
    async fn fetch_field_reads_options() {
        let server = MockServer::start().await;
        let fixture = std::fs::read_to_string("../../../fixtures/json/zendesk-project-field.json")
            .expect("read fixture");

        Mock::given(method("GET"))
            .and(path("/api/v2/ticket_fields/29084117.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture))
            .mount(&server)
            .await;

        let zendesk = ZendeskClient::new(&test_config(&server.uri())).unwrap();
        let field = zendesk.fetch_field(29084117).await.unwrap();

        assert_eq!(field.title.as_deref(), Some("Project"));
        assert_eq!(field.custom_field_options.len(), 2);
        assert_eq!(field.custom_field_options[0].name, "Acme::Website");
    }

    #[tokio::test]
    async fn fetch_field_propagates_http_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v2/ticket_fields/29557247.json"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let zendesk = ZendeskClient::new(&test_config(&server.uri())).unwrap();
        let err = zendesk.fetch_field(29557247).await.unwrap_err();

        assert!(matches!(err, FieldSyncError::Http { status: 403, .. }));
    }

    #[tokio::test]
    async fn write_field_replaces_options() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/v2/ticket_fields/29557247.json"))
            .and(body_json(serde_json::json!({
                "ticket_field": {
                    "custom_field_options": [
                        {"name": "Globex", "value": "client-20-globex"},
                        {"name": "Other", "value": "client-other"}
                    ]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ticket_field": {}}"#))
            .expect(1)
            .mount(&server)
            .await;

        let zendesk = ZendeskClient::new(&test_config(&server.uri())).unwrap();
        let options = vec![
            FieldOption::new("Globex", "client-20-globex"),
            FieldOption::new("Other", "client-other"),
        ];
        zendesk.write_field(29557247, &options).await.unwrap();
    }

    #[tokio::test]
    async fn write_field_propagates_http_error() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/v2/ticket_fields/29557247.json"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        let zendesk = ZendeskClient::new(&test_config(&server.uri())).unwrap();
        let err = zendesk.write_field(29557247, &[]).await.unwrap_err();

        assert!(matches!(err, FieldSyncError::Http { status: 422, .. }));
    }
}
