//! OpenAPI documentation
//!
//! Provides the OpenAPI 3.0 specification and a Swagger UI page for the
//! Mailblast API.

use axum::{
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde_json::json;

/// Create OpenAPI routes
pub fn create_openapi_routes() -> Router {
    Router::new()
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(swagger_ui))
}

/// OpenAPI JSON specification endpoint
async fn openapi_json() -> impl IntoResponse {
    Json(get_openapi_spec())
}

/// Swagger UI HTML endpoint
async fn swagger_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

/// Get the OpenAPI specification as JSON
fn get_openapi_spec() -> serde_json::Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Mailblast API",
            "description": "REST API for the Mailblast campaign dispatcher.\n\nSubmit a campaign, receive a job id immediately, and poll the job until it reaches a terminal state.",
            "version": "1.0.0",
            "license": {
                "name": "Apache-2.0",
                "url": "https://www.apache.org/licenses/LICENSE-2.0"
            }
        },
        "tags": [
            {"name": "health", "description": "Health check endpoints"},
            {"name": "campaigns", "description": "Campaign submission"},
            {"name": "jobs", "description": "Job status and queue admin view"}
        ],
        "paths": {
            "/health": {
                "get": {
                    "tags": ["health"],
                    "summary": "Basic health check",
                    "operationId": "health",
                    "responses": {
                        "200": {"description": "Service is healthy"}
                    }
                }
            },
            "/health/live": {
                "get": {
                    "tags": ["health"],
                    "summary": "Liveness probe",
                    "operationId": "liveness",
                    "responses": {
                        "200": {"description": "Service is alive"}
                    }
                }
            },
            "/health/ready": {
                "get": {
                    "tags": ["health"],
                    "summary": "Readiness probe",
                    "operationId": "readiness",
                    "responses": {
                        "200": {"description": "Service is ready"},
                        "503": {"description": "Service is not ready"}
                    }
                }
            },
            "/api/v1/campaigns": {
                "post": {
                    "tags": ["campaigns"],
                    "summary": "Submit a campaign for background dispatch",
                    "operationId": "submitCampaign",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/Campaign"}
                            }
                        }
                    },
                    "responses": {
                        "202": {
                            "description": "Campaign queued",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/SubmitCampaignResponse"}
                                }
                            }
                        },
                        "400": {"description": "Invalid campaign (e.g. empty audience)"}
                    }
                }
            },
            "/api/v1/jobs/{job_id}": {
                "get": {
                    "tags": ["jobs"],
                    "summary": "Poll a job's status and result",
                    "operationId": "getJobStatus",
                    "parameters": [
                        {"name": "job_id", "in": "path", "required": true, "schema": {"type": "integer", "format": "int64"}}
                    ],
                    "responses": {
                        "200": {
                            "description": "Job status; `exists` is false for unknown or purged ids",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/JobStatus"}
                                }
                            }
                        }
                    }
                }
            },
            "/api/v1/jobs": {
                "get": {
                    "tags": ["jobs"],
                    "summary": "List jobs by lifecycle state",
                    "operationId": "listJobs",
                    "parameters": [
                        {"name": "state", "in": "query", "schema": {"type": "string", "enum": ["queued", "delayed", "active", "completed", "failed"], "default": "completed"}},
                        {"name": "start", "in": "query", "schema": {"type": "integer", "default": 0}},
                        {"name": "end", "in": "query", "schema": {"type": "integer", "default": 10}}
                    ],
                    "responses": {
                        "200": {"description": "Job summaries, newest first"}
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Campaign": {
                    "type": "object",
                    "required": ["subject", "html_body", "sender_name", "audience"],
                    "properties": {
                        "subject": {"type": "string", "description": "Subject template with {{key}} placeholders"},
                        "html_body": {"type": "string", "description": "HTML body template with {{key}} placeholders"},
                        "sender_name": {"type": "string"},
                        "audience": {
                            "type": "array",
                            "minItems": 1,
                            "items": {"$ref": "#/components/schemas/Recipient"}
                        },
                        "certificate": {"$ref": "#/components/schemas/CertificateConfig"},
                        "documents": {"$ref": "#/components/schemas/DocumentAttachmentConfig"}
                    }
                },
                "Recipient": {
                    "type": "object",
                    "required": ["email"],
                    "properties": {
                        "email": {"type": "string", "format": "email"},
                        "first_name": {"type": "string"},
                        "last_name": {"type": "string"},
                        "company": {"type": "string"},
                        "custom_fields": {"type": "object", "additionalProperties": {"type": "string"}}
                    }
                },
                "CertificateConfig": {
                    "type": "object",
                    "required": ["background", "fields"],
                    "properties": {
                        "background": {"type": "string", "description": "Background image reference"},
                        "fields": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["text", "x", "y", "font_size"],
                                "properties": {
                                    "text": {"type": "string"},
                                    "x": {"type": "number"},
                                    "y": {"type": "number"},
                                    "font_size": {"type": "number"},
                                    "color": {"type": "string", "default": "#000000"},
                                    "bold": {"type": "boolean", "default": true},
                                    "stroke": {"type": "boolean", "default": true},
                                    "stroke_color": {"type": "string"}
                                }
                            }
                        }
                    }
                },
                "DocumentAttachmentConfig": {
                    "type": "object",
                    "required": ["documents", "mapping_field"],
                    "properties": {
                        "documents": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["name", "content_type", "data"],
                                "properties": {
                                    "name": {"type": "string"},
                                    "content_type": {"type": "string"},
                                    "data": {"type": "string", "format": "byte", "description": "Base64 encoded content"}
                                }
                            }
                        },
                        "mapping_field": {"type": "string", "description": "Recipient field matched against document filename stems"}
                    }
                },
                "SubmitCampaignResponse": {
                    "type": "object",
                    "properties": {
                        "job_id": {"type": "integer", "format": "int64"},
                        "status": {"type": "string", "example": "queued"},
                        "message": {"type": "string"}
                    }
                },
                "JobStatus": {
                    "type": "object",
                    "properties": {
                        "exists": {"type": "boolean"},
                        "job_id": {"type": "integer", "format": "int64"},
                        "state": {"type": "string", "enum": ["queued", "delayed", "active", "completed", "failed"]},
                        "progress": {"type": "integer", "minimum": 0, "maximum": 100},
                        "result": {"$ref": "#/components/schemas/CampaignReport"},
                        "failure_reason": {"type": "string"},
                        "attempts": {"type": "integer"},
                        "created_at": {"type": "string", "format": "date-time"},
                        "started_at": {"type": "string", "format": "date-time"},
                        "finished_at": {"type": "string", "format": "date-time"}
                    }
                },
                "CampaignReport": {
                    "type": "object",
                    "properties": {
                        "success": {"type": "integer"},
                        "failed": {"type": "integer"},
                        "errors": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "email": {"type": "string"},
                                    "error": {"type": "string"}
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}

/// Swagger UI HTML template
const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Mailblast API Documentation</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui.css" />
    <style>
        body { margin: 0; padding: 0; }
        .swagger-ui .topbar { display: none; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            SwaggerUIBundle({
                url: "/openapi.json",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIBundle.SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>"#;
