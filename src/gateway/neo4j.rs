//! Neo4jGateway: gateway over the Neo4j HTTP transactional endpoint
//!
//! Each call is one auto-committed transaction
//! (`POST /db/{database}/tx/commit`). Values travel as statement
//! parameters; labels, property keys and relationship types cannot be
//! parameterised in Cypher, so they are checked and backtick-quoted.

use super::{GatewayError, GatewayResult, GraphGateway};
use crate::config::Neo4jConfig;
use crate::graph::{EdgeType, Label, Node, NodeId, PropertyMap, PropertyValue};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// A single Cypher statement with its parameters
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Statement {
    pub statement: String,
    pub parameters: JsonMap<String, JsonValue>,
}

#[derive(Debug, Serialize)]
struct TxRequest<'a> {
    statements: [&'a Statement; 1],
}

#[derive(Debug, Default, Deserialize)]
pub struct TxResponse {
    #[serde(default)]
    pub results: Vec<StatementResult>,
    #[serde(default)]
    pub errors: Vec<TxError>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatementResult {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<ResultRow>,
}

#[derive(Debug, Deserialize)]
pub struct ResultRow {
    pub row: Vec<JsonValue>,
}

#[derive(Debug, Deserialize)]
pub struct TxError {
    pub code: String,
    pub message: String,
}

/// Backtick-quote a label, key or relationship type after checking it only
/// contains ASCII letters, digits and underscores.
pub fn quote_identifier(name: &str) -> GatewayResult<String> {
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(format!("`{}`", name))
    } else {
        Err(GatewayError::InvalidIdentifier(name.to_string()))
    }
}

fn properties_to_json(properties: &PropertyMap) -> JsonValue {
    JsonValue::Object(properties.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
}

/// Lookup statement returning `id(n), labels(n), properties(n)` of the
/// lowest-id match.
pub fn find_statement(label: Option<&Label>, filters: &[(&str, PropertyValue)]) -> GatewayResult<Statement> {
    let pattern = match label {
        Some(label) => format!("(n:{})", quote_identifier(label.as_str())?),
        None => "(n)".to_string(),
    };

    let mut parameters = JsonMap::new();
    let mut conditions = Vec::with_capacity(filters.len());
    for (i, (key, value)) in filters.iter().enumerate() {
        let param = format!("p{}", i);
        conditions.push(format!("n.{} = ${}", quote_identifier(key)?, param));
        parameters.insert(param, value.to_json());
    }

    let mut statement = format!("MATCH {}", pattern);
    if !conditions.is_empty() {
        statement.push_str(" WHERE ");
        statement.push_str(&conditions.join(" AND "));
    }
    statement.push_str(" RETURN id(n), labels(n), properties(n) ORDER BY id(n) LIMIT 1");

    Ok(Statement { statement, parameters })
}

/// Counts how many of the given node ids exist
pub fn merge_statement(ids: &BTreeSet<u64>) -> Statement {
    let mut parameters = JsonMap::new();
    parameters.insert("ids".to_string(), json!(ids));
    Statement {
        statement: "MATCH (n) WHERE id(n) IN $ids RETURN count(n)".to_string(),
        parameters,
    }
}

/// Appends a relationship between two nodes identified by id
pub fn relationship_statement(
    from: NodeId,
    to: NodeId,
    rel_type: &EdgeType,
    properties: &PropertyMap,
) -> GatewayResult<Statement> {
    let mut parameters = JsonMap::new();
    parameters.insert("from".to_string(), json!(from.as_u64()));
    parameters.insert("to".to_string(), json!(to.as_u64()));
    parameters.insert("props".to_string(), properties_to_json(properties));
    Ok(Statement {
        statement: format!(
            "MATCH (a), (b) WHERE id(a) = $from AND id(b) = $to CREATE (a)-[r:{}]->(b) SET r = $props RETURN id(r)",
            quote_identifier(rel_type.as_str())?
        ),
        parameters,
    })
}

/// Writes the named properties of the node copy onto the stored node.
/// Only those keys are sent; `+=` leaves every other stored property as the
/// server has it. Null or absent values are sent as `null`, which removes
/// the property.
pub fn push_statement(node: &Node, keys: &[String]) -> Statement {
    let props: JsonMap<String, JsonValue> = keys
        .iter()
        .map(|key| {
            let value = node.get_property(key).map_or(JsonValue::Null, PropertyValue::to_json);
            (key.clone(), value)
        })
        .collect();

    let mut parameters = JsonMap::new();
    parameters.insert("id".to_string(), json!(node.id.as_u64()));
    parameters.insert("props".to_string(), JsonValue::Object(props));
    Statement {
        statement: "MATCH (n) WHERE id(n) = $id SET n += $props RETURN id(n)".to_string(),
        parameters,
    }
}

/// Decode a `[id, labels, properties]` row into a node
pub fn parse_node_row(row: &[JsonValue]) -> GatewayResult<Node> {
    let malformed = || GatewayError::Rejected(format!("unexpected node row: {:?}", row));

    let id = row.first().and_then(JsonValue::as_u64).ok_or_else(malformed)?;
    let labels = row
        .get(1)
        .and_then(JsonValue::as_array)
        .ok_or_else(malformed)?
        .iter()
        .filter_map(JsonValue::as_str)
        .map(Label::new)
        .collect();
    let properties = row
        .get(2)
        .and_then(JsonValue::as_object)
        .ok_or_else(malformed)?
        .iter()
        .map(|(k, v)| (k.clone(), PropertyValue::from_json(v)))
        .collect();

    Ok(Node::new_with_properties(NodeId::new(id), labels, properties))
}

/// Turn a transactional response into the first statement result, or an
/// error if the server reported one.
pub fn into_result(response: TxResponse) -> GatewayResult<StatementResult> {
    if let Some(error) = response.errors.first() {
        return Err(GatewayError::Rejected(format!("{}: {}", error.code, error.message)));
    }
    Ok(response.results.into_iter().next().unwrap_or_default())
}

fn single_count(result: &StatementResult) -> Option<u64> {
    result.data.first()?.row.first()?.as_u64()
}

/// Gateway backed by a Neo4j server
pub struct Neo4jGateway {
    config: Neo4jConfig,
    client: Client,
    commit_url: String,
}

impl Neo4jGateway {
    /// Connect and verify the server answers, retrying per the config.
    pub fn connect(config: Neo4jConfig) -> GatewayResult<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let gateway = Self {
            commit_url: config.commit_url(),
            client,
            config,
        };

        let attempts = gateway.config.connect_retries.max(1);
        for attempt in 1..=attempts {
            match gateway.run(&Statement {
                statement: "RETURN 1".to_string(),
                parameters: JsonMap::new(),
            }) {
                Ok(_) => {
                    info!(
                        "Connected to Neo4j server: {} ({})",
                        gateway.config.uri, gateway.config.user
                    );
                    return Ok(gateway);
                }
                Err(e) => {
                    warn!(
                        "Connection attempt {}/{} to {} failed: {}",
                        attempt, attempts, gateway.config.uri, e
                    );
                    if attempt < attempts {
                        std::thread::sleep(gateway.config.retry_delay);
                    }
                }
            }
        }

        Err(GatewayError::Connection(format!(
            "gave up on {} after {} attempts",
            gateway.config.uri, attempts
        )))
    }

    fn run(&self, statement: &Statement) -> GatewayResult<StatementResult> {
        debug!("Cypher: {}", statement.statement);
        let response = self
            .client
            .post(&self.commit_url)
            .basic_auth(&self.config.user, Some(&self.config.password))
            .json(&TxRequest { statements: [statement] })
            .send()?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GatewayError::Connection(
                format!("authentication failed for user {}", self.config.user),
            )),
            status if !status.is_success() => {
                Err(GatewayError::Rejected(format!("server returned {}", status)))
            }
            _ => into_result(response.json::<TxResponse>()?),
        }
    }
}

impl GraphGateway for Neo4jGateway {
    fn find_node(
        &mut self,
        label: Option<&Label>,
        filters: &[(&str, PropertyValue)],
    ) -> GatewayResult<Option<Node>> {
        let result = self.run(&find_statement(label, filters)?)?;
        result
            .data
            .first()
            .map(|row| parse_node_row(&row.row))
            .transpose()
    }

    fn merge_nodes(&mut self, nodes: &[&Node]) -> GatewayResult<()> {
        let ids: BTreeSet<u64> = nodes.iter().map(|n| n.id.as_u64()).collect();
        let result = self.run(&merge_statement(&ids))?;
        let present = single_count(&result).unwrap_or(0);
        // Server-side nodes cannot be re-created under their old id.
        if present != ids.len() as u64 {
            return Err(GatewayError::Rejected(format!(
                "{} of {} nodes to merge are missing",
                ids.len() as u64 - present.min(ids.len() as u64),
                ids.len()
            )));
        }
        Ok(())
    }

    fn create_relationship(
        &mut self,
        from: &Node,
        to: &Node,
        rel_type: &EdgeType,
        properties: PropertyMap,
    ) -> GatewayResult<()> {
        let result = self.run(&relationship_statement(from.id, to.id, rel_type, &properties)?)?;
        if result.data.is_empty() {
            return Err(GatewayError::Rejected(format!(
                "{} between {} and {} was not created",
                rel_type, from.id, to.id
            )));
        }
        Ok(())
    }

    fn push(&mut self, node: &Node, keys: &[String]) -> GatewayResult<()> {
        let result = self.run(&push_statement(node, keys))?;
        if result.data.is_empty() {
            return Err(GatewayError::NodeGone(node.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("HasSession").unwrap(), "`HasSession`");
        assert_eq!(quote_identifier("gp_link2").unwrap(), "`gp_link2`");
        assert!(quote_identifier("").is_err());
        assert!(quote_identifier("User`) DETACH DELETE n //").is_err());
    }

    #[test]
    fn test_find_statement_with_label() {
        let computer = Label::new("Computer");
        let stmt = find_statement(Some(&computer), &[("name", "WKSTN01.LAB.LOCAL".into())]).unwrap();
        assert_eq!(
            stmt.statement,
            "MATCH (n:`Computer`) WHERE n.`name` = $p0 RETURN id(n), labels(n), properties(n) ORDER BY id(n) LIMIT 1"
        );
        assert_eq!(stmt.parameters["p0"], json!("WKSTN01.LAB.LOCAL"));
    }

    #[test]
    fn test_find_statement_without_label_or_filters() {
        let stmt = find_statement(None, &[]).unwrap();
        assert!(stmt.statement.starts_with("MATCH (n) RETURN"));
        assert!(stmt.parameters.is_empty());
    }

    #[test]
    fn test_relationship_statement() {
        let mut props = PropertyMap::new();
        props.insert("type".to_string(), "interactive".into());
        let stmt = relationship_statement(NodeId::new(3), NodeId::new(9), &EdgeType::new("HasSession"), &props).unwrap();

        assert!(stmt.statement.contains("CREATE (a)-[r:`HasSession`]->(b)"));
        assert_eq!(stmt.parameters["from"], json!(3));
        assert_eq!(stmt.parameters["to"], json!(9));
        assert_eq!(stmt.parameters["props"], json!({"type": "interactive"}));

        assert!(relationship_statement(NodeId::new(1), NodeId::new(2), &EdgeType::new("Has Session"), &props).is_err());
    }

    #[test]
    fn test_push_statement() {
        let mut node = Node::new(NodeId::new(12), "GPO");
        node.set_property("gplink", "X");
        let stmt = push_statement(&node, &["gplink".to_string()]);
        assert!(stmt.statement.contains("SET n += $props"));
        assert_eq!(stmt.parameters["props"], json!({"gplink": "X"}));
        assert_eq!(stmt.parameters["id"], json!(12));
    }

    #[test]
    fn test_push_statement_sends_only_named_keys() {
        let row = vec![
            json!(7),
            json!(["Computer"]),
            json!({"name": "WKSTN01.LAB.LOCAL", "lastlogon": "2024-01-02T03:04:05Z", "spn": {"x": 1}}),
        ];
        let mut node = parse_node_row(&row).unwrap();
        node.set_property("owned", true);
        node.set_property("note", PropertyValue::Null);

        let stmt = push_statement(&node, &["owned".to_string(), "note".to_string()]);
        assert_eq!(stmt.parameters["props"], json!({"owned": true, "note": null}));
    }

    #[test]
    fn test_merge_statement_dedups_ids() {
        let ids: BTreeSet<u64> = [4, 2, 4].into_iter().collect();
        assert_eq!(merge_statement(&ids).parameters["ids"], json!([2, 4]));
    }

    #[test]
    fn test_parse_node_row() {
        let row = vec![json!(7), json!(["User", "Base"]), json!({"name": "BOB@LAB.LOCAL", "owned": false})];
        let node = parse_node_row(&row).unwrap();
        assert_eq!(node.id, NodeId::new(7));
        assert!(node.has_label(&Label::new("Base")));
        assert_eq!(node.name(), Some("BOB@LAB.LOCAL"));
        assert_eq!(node.get_property("owned"), Some(&PropertyValue::Boolean(false)));

        assert!(parse_node_row(&[json!("x")]).is_err());
    }

    #[test]
    fn test_into_result_surfaces_errors() {
        let response: TxResponse = serde_json::from_value(json!({
            "results": [],
            "errors": [{"code": "Neo.ClientError.Statement.SyntaxError", "message": "bad"}]
        }))
        .unwrap();
        let err = into_result(response).unwrap_err();
        assert!(err.to_string().contains("SyntaxError"));
    }

    #[test]
    fn test_into_result_and_count() {
        let response: TxResponse = serde_json::from_value(json!({
            "results": [{"columns": ["count(n)"], "data": [{"row": [2], "meta": [null]}]}],
            "errors": []
        }))
        .unwrap();
        let result = into_result(response).unwrap();
        assert_eq!(single_count(&result), Some(2));
    }
}
