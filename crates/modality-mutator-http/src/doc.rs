//! Self-describing OpenAPI document served at `/api-doc.json`.

use serde_json::{Value, json};

use crate::api::MUTATOR_API_KEY_HEADER;

fn id_param() -> Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "description": "Mutator correlation id",
        "schema": { "type": "string", "format": "uuid" }
    })
}

fn auth_responses() -> Value {
    json!({
        "400": { "description": "Missing mutator_apikey request header" },
        "401": { "description": "Wrong api key" }
    })
}

fn with_auth(mut responses: Value) -> Value {
    if let (Some(map), Value::Object(auth)) = (responses.as_object_mut(), auth_responses()) {
        map.extend(auth);
    }
    responses
}

pub fn openapi() -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "modality mutator API",
            "version": env!("CARGO_PKG_VERSION")
        },
        "paths": {
            "/mutator": {
                "get": {
                    "tags": ["mutator"],
                    "summary": "List mutators",
                    "responses": with_auth(json!({
                        "200": {
                            "description": "Registered mutators",
                            "content": { "application/json": { "schema": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Mutator" }
                            }}}
                        }
                    })),
                    "security": [{ "api_key": [] }]
                }
            },
            "/mutator/{id}": {
                "get": {
                    "tags": ["mutator"],
                    "summary": "Describe one mutator",
                    "parameters": [id_param()],
                    "responses": with_auth(json!({
                        "200": {
                            "description": "Mutator",
                            "content": { "application/json": { "schema": {
                                "$ref": "#/components/schemas/Mutator"
                            }}}
                        },
                        "404": { "description": "Mutator not found" }
                    })),
                    "security": [{ "api_key": [] }]
                }
            },
            "/mutator/{id}/mutation": {
                "post": {
                    "tags": ["mutator"],
                    "summary": "Inject a mutation",
                    "parameters": [id_param()],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": {
                            "$ref": "#/components/schemas/Mutation"
                        }}}
                    },
                    "responses": with_auth(json!({
                        "201": { "description": "Mutation injected" },
                        "404": { "description": "Mutator not found" },
                        "409": { "description": "Mutator already has an active mutation" },
                        "422": { "description": "Parameters do not match the descriptor" },
                        "500": { "description": "Internal mutator error" }
                    })),
                    "security": [{ "api_key": [] }]
                },
                "delete": {
                    "tags": ["mutator"],
                    "summary": "Reset the mutator",
                    "parameters": [id_param()],
                    "responses": with_auth(json!({
                        "200": { "description": "Mutator reset" },
                        "404": { "description": "Mutator not found" },
                        "500": { "description": "Internal mutator error" }
                    })),
                    "security": [{ "api_key": [] }]
                }
            }
        },
        "components": {
            "schemas": {
                "Mutator": {
                    "type": "object",
                    "required": ["mutator_correlation_id", "attributes"],
                    "properties": {
                        "mutator_correlation_id": { "type": "string", "format": "uuid" },
                        "attributes": {
                            "type": "object",
                            "description": "Flat descriptor attributes, e.g. mutator.name",
                            "additionalProperties": true
                        }
                    }
                },
                "Mutation": {
                    "type": "object",
                    "required": ["mutation"],
                    "properties": {
                        "mutation": { "type": "string", "format": "uuid" },
                        "params": { "type": "object", "additionalProperties": true }
                    }
                }
            },
            "securitySchemes": {
                "api_key": { "type": "apiKey", "in": "header", "name": MUTATOR_API_KEY_HEADER }
            }
        },
        "tags": [{ "name": "mutator", "description": "Mutator API" }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_lists_every_route() {
        let doc = openapi();
        let paths = doc["paths"].as_object().unwrap();
        assert!(paths.contains_key("/mutator"));
        assert!(paths["/mutator/{id}/mutation"].get("delete").is_some());
        assert_eq!(
            doc["paths"]["/mutator/{id}/mutation"]["post"]["responses"]["409"]["description"],
            "Mutator already has an active mutation"
        );
        assert_eq!(doc["components"]["securitySchemes"]["api_key"]["name"], "mutator_apikey");
    }
}
