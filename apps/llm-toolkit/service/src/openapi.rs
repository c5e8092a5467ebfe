use serde_json::{Map, Value, json};

pub const ROUTE_HEALTH: &str = "/api/health";
pub const ROUTE_OPENAPI_JSON: &str = "/openapi.json";
pub const ROUTE_AUTH_REGISTER: &str = "/api/auth/register";
pub const ROUTE_AUTH_LOGIN: &str = "/api/auth/login";
pub const ROUTE_AUTH_TOKEN: &str = "/api/auth/token";
pub const ROUTE_AUTH_PROFILE: &str = "/api/auth/profile";
pub const ROUTE_AUTH_LOGOUT: &str = "/api/auth/logout";
pub const ROUTE_PROJECTS: &str = "/api/projects";
pub const ROUTE_PROJECTS_BY_ID: &str = "/api/projects/:project_id";
pub const ROUTE_MODELS: &str = "/api/models";
pub const ROUTE_MODELS_BY_ID: &str = "/api/models/:model_id";
pub const ROUTE_DATASETS: &str = "/api/projects/:project_id/datasets";
pub const ROUTE_DATASETS_UPLOAD: &str = "/api/projects/:project_id/datasets/upload";
pub const ROUTE_DATASETS_BY_ID: &str = "/api/projects/:project_id/datasets/:dataset_id";
pub const ROUTE_DATASETS_VALIDATE: &str =
    "/api/projects/:project_id/datasets/:dataset_id/validate";
pub const ROUTE_DATASETS_MAPPING: &str = "/api/projects/:project_id/datasets/:dataset_id/mapping";
pub const ROUTE_FINE_TUNES: &str = "/api/projects/:project_id/fine-tunes";
pub const ROUTE_FINE_TUNES_BY_ID: &str = "/api/projects/:project_id/fine-tunes/:run_id";
pub const ROUTE_FINE_TUNES_LOGS: &str = "/api/projects/:project_id/fine-tunes/:run_id/logs";
pub const ROUTE_FINE_TUNES_METRICS: &str = "/api/projects/:project_id/fine-tunes/:run_id/metrics";
pub const ROUTE_FINE_TUNES_STOP: &str = "/api/projects/:project_id/fine-tunes/:run_id/stop";
pub const ROUTE_ENDPOINTS: &str = "/api/projects/:project_id/endpoints";
pub const ROUTE_ENDPOINTS_BY_ID: &str = "/api/projects/:project_id/endpoints/:endpoint_id";
pub const ROUTE_ENDPOINTS_INVOKE: &str =
    "/api/projects/:project_id/endpoints/:endpoint_id/invoke";
pub const ROUTE_RESEARCH: &str = "/api/projects/:project_id/research";
pub const ROUTE_RESEARCH_BY_ID: &str = "/api/projects/:project_id/research/:session_id";
pub const ROUTE_RESEARCH_STREAM: &str = "/api/projects/:project_id/research/:session_id/stream";
pub const ROUTE_RESEARCH_STOP: &str = "/api/projects/:project_id/research/:session_id/stop";
pub const ROUTE_ASSISTANT_CHAT: &str = "/api/assistant/chat";
pub const ROUTE_ASSISTANT_SUGGESTIONS: &str = "/api/assistant/suggestions";

#[derive(Clone, Copy)]
struct OpenApiContract {
    method: &'static str,
    route_path: &'static str,
    operation_id: &'static str,
    summary: &'static str,
    tag: &'static str,
    secured: bool,
    success_status: &'static str,
    request_example: Option<&'static str>,
    response_example: Option<&'static str>,
}

impl OpenApiContract {
    const fn public(
        method: &'static str,
        route_path: &'static str,
        operation_id: &'static str,
        summary: &'static str,
        tag: &'static str,
    ) -> Self {
        Self {
            method,
            route_path,
            operation_id,
            summary,
            tag,
            secured: false,
            success_status: "200",
            request_example: None,
            response_example: None,
        }
    }

    const fn secured(
        method: &'static str,
        route_path: &'static str,
        operation_id: &'static str,
        summary: &'static str,
        tag: &'static str,
    ) -> Self {
        let mut contract = Self::public(method, route_path, operation_id, summary, tag);
        contract.secured = true;
        contract
    }

    const fn created(mut self) -> Self {
        self.success_status = "201";
        self
    }

    const fn with_request(mut self, key: &'static str) -> Self {
        self.request_example = Some(key);
        self
    }

    const fn with_response(mut self, key: &'static str) -> Self {
        self.response_example = Some(key);
        self
    }
}

const OPENAPI_CONTRACTS: &[OpenApiContract] = &[
    OpenApiContract::public("get", ROUTE_HEALTH, "health", "Service liveness probe.", "meta")
        .with_response("health"),
    OpenApiContract::public(
        "get",
        ROUTE_OPENAPI_JSON,
        "openapiDocument",
        "This document.",
        "meta",
    ),
    OpenApiContract::public(
        "post",
        ROUTE_AUTH_REGISTER,
        "authRegister",
        "Create an account and issue a bearer token.",
        "auth",
    )
    .with_request("auth_register")
    .with_response("auth_session"),
    OpenApiContract::public(
        "post",
        ROUTE_AUTH_LOGIN,
        "authLogin",
        "Exchange email and password for a bearer token.",
        "auth",
    )
    .with_request("auth_login")
    .with_response("auth_session"),
    OpenApiContract::public(
        "post",
        ROUTE_AUTH_TOKEN,
        "authToken",
        "OAuth2 password grant (form encoded, bare response).",
        "auth",
    )
    .with_response("auth_token"),
    OpenApiContract::secured(
        "get",
        ROUTE_AUTH_PROFILE,
        "authProfile",
        "Read the authenticated user.",
        "auth",
    )
    .with_response("auth_user"),
    OpenApiContract::secured(
        "patch",
        ROUTE_AUTH_PROFILE,
        "authProfileUpdate",
        "Update name, organization or default region.",
        "auth",
    )
    .with_request("auth_profile_update")
    .with_response("auth_user"),
    OpenApiContract::secured(
        "post",
        ROUTE_AUTH_LOGOUT,
        "authLogout",
        "Acknowledge logout. Tokens are stateless.",
        "auth",
    ),
    OpenApiContract::secured(
        "get",
        ROUTE_PROJECTS,
        "projectList",
        "List owned projects, newest first, paginated.",
        "projects",
    )
    .with_response("project_page"),
    OpenApiContract::secured(
        "post",
        ROUTE_PROJECTS,
        "projectCreate",
        "Create a project.",
        "projects",
    )
    .created()
    .with_request("project_create")
    .with_response("project"),
    OpenApiContract::secured(
        "get",
        ROUTE_PROJECTS_BY_ID,
        "projectShow",
        "Read one owned project.",
        "projects",
    )
    .with_response("project"),
    OpenApiContract::secured(
        "patch",
        ROUTE_PROJECTS_BY_ID,
        "projectUpdate",
        "Patch name, description or tags.",
        "projects",
    )
    .with_request("project_update")
    .with_response("project"),
    OpenApiContract::secured(
        "delete",
        ROUTE_PROJECTS_BY_ID,
        "projectDelete",
        "Delete a project row.",
        "projects",
    ),
    OpenApiContract::public(
        "get",
        ROUTE_MODELS,
        "modelList",
        "List catalog models matching the optional filters.",
        "models",
    ),
    OpenApiContract::public(
        "get",
        ROUTE_MODELS_BY_ID,
        "modelShow",
        "Read one catalog model.",
        "models",
    ),
    OpenApiContract::secured(
        "get",
        ROUTE_DATASETS,
        "datasetList",
        "List datasets in a project.",
        "datasets",
    ),
    OpenApiContract::secured(
        "post",
        ROUTE_DATASETS_UPLOAD,
        "datasetUpload",
        "Register an uploaded dataset file (multipart field `file`).",
        "datasets",
    )
    .created()
    .with_response("dataset"),
    OpenApiContract::secured(
        "get",
        ROUTE_DATASETS_BY_ID,
        "datasetShow",
        "Read one dataset.",
        "datasets",
    )
    .with_response("dataset"),
    OpenApiContract::secured(
        "delete",
        ROUTE_DATASETS_BY_ID,
        "datasetDelete",
        "Delete a dataset.",
        "datasets",
    ),
    OpenApiContract::secured(
        "post",
        ROUTE_DATASETS_VALIDATE,
        "datasetValidate",
        "Run dataset validation.",
        "datasets",
    )
    .with_response("dataset_validation"),
    OpenApiContract::secured(
        "patch",
        ROUTE_DATASETS_MAPPING,
        "datasetMappingUpdate",
        "Replace the dataset column mapping.",
        "datasets",
    )
    .with_request("dataset_mapping"),
    OpenApiContract::secured(
        "get",
        ROUTE_FINE_TUNES,
        "trainingRunList",
        "List training runs in a project.",
        "fine-tunes",
    ),
    OpenApiContract::secured(
        "post",
        ROUTE_FINE_TUNES,
        "trainingRunCreate",
        "Start a training run.",
        "fine-tunes",
    )
    .created()
    .with_request("training_run_create"),
    OpenApiContract::secured(
        "get",
        ROUTE_FINE_TUNES_BY_ID,
        "trainingRunShow",
        "Read one training run.",
        "fine-tunes",
    ),
    OpenApiContract::secured(
        "get",
        ROUTE_FINE_TUNES_LOGS,
        "trainingRunLogs",
        "Read training log lines.",
        "fine-tunes",
    )
    .with_response("training_logs"),
    OpenApiContract::secured(
        "get",
        ROUTE_FINE_TUNES_METRICS,
        "trainingRunMetrics",
        "Read the training loss history.",
        "fine-tunes",
    )
    .with_response("training_metrics"),
    OpenApiContract::secured(
        "post",
        ROUTE_FINE_TUNES_STOP,
        "trainingRunStop",
        "Request that a training run stop.",
        "fine-tunes",
    ),
    OpenApiContract::secured(
        "get",
        ROUTE_ENDPOINTS,
        "endpointList",
        "List inference endpoints in a project.",
        "endpoints",
    ),
    OpenApiContract::secured(
        "post",
        ROUTE_ENDPOINTS,
        "endpointCreate",
        "Deploy a training run to an endpoint.",
        "endpoints",
    )
    .created()
    .with_request("endpoint_create"),
    OpenApiContract::secured(
        "get",
        ROUTE_ENDPOINTS_BY_ID,
        "endpointShow",
        "Read one endpoint.",
        "endpoints",
    ),
    OpenApiContract::secured(
        "patch",
        ROUTE_ENDPOINTS_BY_ID,
        "endpointUpdate",
        "Patch name, instance count, auto scaling or status.",
        "endpoints",
    )
    .with_request("endpoint_update"),
    OpenApiContract::secured(
        "delete",
        ROUTE_ENDPOINTS_BY_ID,
        "endpointDelete",
        "Delete an endpoint.",
        "endpoints",
    ),
    OpenApiContract::secured(
        "post",
        ROUTE_ENDPOINTS_INVOKE,
        "endpointInvoke",
        "Send chat messages to an in-service endpoint.",
        "endpoints",
    )
    .with_request("endpoint_invoke")
    .with_response("endpoint_invoke"),
    OpenApiContract::secured(
        "get",
        ROUTE_RESEARCH,
        "researchSessionList",
        "List research sessions in a project.",
        "research",
    ),
    OpenApiContract::secured(
        "post",
        ROUTE_RESEARCH,
        "researchSessionCreate",
        "Open a research session for a question.",
        "research",
    )
    .created()
    .with_request("research_create"),
    OpenApiContract::secured(
        "get",
        ROUTE_RESEARCH_BY_ID,
        "researchSessionShow",
        "Read one research session.",
        "research",
    ),
    OpenApiContract::secured(
        "delete",
        ROUTE_RESEARCH_BY_ID,
        "researchSessionDelete",
        "Delete a research session.",
        "research",
    ),
    OpenApiContract::secured(
        "get",
        ROUTE_RESEARCH_STREAM,
        "researchSessionStream",
        "Streaming placeholder; returns the session snapshot.",
        "research",
    ),
    OpenApiContract::secured(
        "post",
        ROUTE_RESEARCH_STOP,
        "researchSessionStop",
        "Stop a research session.",
        "research",
    ),
    OpenApiContract::secured(
        "post",
        ROUTE_ASSISTANT_CHAT,
        "assistantChat",
        "Ask the built-in help assistant.",
        "assistant",
    )
    .with_request("assistant_chat")
    .with_response("assistant_chat"),
    OpenApiContract::secured(
        "get",
        ROUTE_ASSISTANT_SUGGESTIONS,
        "assistantSuggestions",
        "Suggested questions for a UI context.",
        "assistant",
    ),
];

pub fn openapi_document() -> Value {
    let mut paths = Map::new();
    for contract in OPENAPI_CONTRACTS {
        add_operation(&mut paths, contract);
    }

    json!({
        "openapi": "3.0.2",
        "info": {
            "title": "LLM Toolkit API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Mock control API for projects, datasets, fine-tuning runs, inference endpoints and research sessions."
        },
        "servers": [
            { "url": "http://localhost:8000" }
        ],
        "paths": Value::Object(paths),
        "components": {
            "securitySchemes": {
                "bearerAuth": {
                    "type": "http",
                    "scheme": "bearer",
                    "bearerFormat": "JWT"
                }
            },
            "schemas": {
                "ApiDataEnvelope": {
                    "type": "object",
                    "properties": {
                        "success": { "type": "boolean" },
                        "data": {}
                    },
                    "required": ["success"]
                },
                "ApiErrorResponse": {
                    "type": "object",
                    "properties": {
                        "success": { "type": "boolean" },
                        "error": { "type": "string" },
                        "code": { "type": "string" },
                        "errors": {
                            "type": "object",
                            "additionalProperties": {
                                "type": "array",
                                "items": { "type": "string" }
                            }
                        }
                    },
                    "required": ["success", "error", "code"]
                }
            },
            "responses": {
                "ErrorEnvelope": {
                    "description": "Error response envelope",
                    "content": {
                        "application/json": {
                            "schema": { "$ref": "#/components/schemas/ApiErrorResponse" },
                            "example": {
                                "success": false,
                                "error": "Could not validate credentials",
                                "code": "unauthorized"
                            }
                        }
                    }
                }
            }
        }
    })
}

fn add_operation(paths: &mut Map<String, Value>, contract: &OpenApiContract) {
    let path = to_openapi_path(contract.route_path);
    let method = contract.method.to_ascii_lowercase();

    let mut operation = json!({
        "operationId": contract.operation_id,
        "summary": contract.summary,
        "tags": [contract.tag],
        "responses": {
            contract.success_status: {
                "description": "Success",
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ApiDataEnvelope" }
                    }
                }
            },
            "default": { "$ref": "#/components/responses/ErrorEnvelope" }
        },
        "x-rustRoute": contract.route_path,
    });

    if contract.secured {
        operation["security"] = json!([{ "bearerAuth": [] }]);
    }

    if let Some(example_key) = contract.request_example {
        let mut request_body = json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "type": "object", "additionalProperties": true }
                }
            }
        });
        if let Some(example) = request_example(example_key) {
            request_body["content"]["application/json"]["example"] = example;
        }
        operation["requestBody"] = request_body;
    }

    if let Some(example) = contract.response_example.and_then(response_example) {
        operation["responses"][contract.success_status]["content"]["application/json"]["example"] =
            example;
    }

    let parameters = path_parameters(contract.route_path);
    if !parameters.is_empty() {
        operation["parameters"] = Value::Array(parameters);
    }

    let path_item = paths
        .entry(path)
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(item) = path_item.as_object_mut() {
        item.insert(method, operation);
    }
}

fn to_openapi_path(route_path: &str) -> String {
    route_path
        .split('/')
        .map(|segment| {
            if let Some(parameter) = segment.strip_prefix(':') {
                format!("{{{parameter}}}")
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<String>>()
        .join("/")
}

fn path_parameters(route_path: &str) -> Vec<Value> {
    route_path
        .split('/')
        .filter_map(|segment| segment.strip_prefix(':'))
        .map(|parameter| {
            json!({
                "name": parameter,
                "in": "path",
                "required": true,
                "schema": {"type": "string"}
            })
        })
        .collect()
}

fn request_example(key: &str) -> Option<Value> {
    match key {
        "auth_register" => Some(json!({
            "email": "ada@example.com",
            "password": "correct horse battery staple",
            "name": "Ada Lovelace"
        })),
        "auth_login" => Some(json!({
            "email": "ada@example.com",
            "password": "correct horse battery staple"
        })),
        "auth_profile_update" => Some(json!({
            "organization": "Analytical Engines Ltd",
            "default_region": "eu-west-1"
        })),
        "project_create" => Some(json!({
            "name": "Support bot",
            "description": "Fine-tune on support transcripts",
            "type": "fine-tune",
            "tags": ["support", "chat"]
        })),
        "project_update" => Some(json!({ "name": "Support bot v2", "tags": ["support"] })),
        "dataset_mapping" => Some(json!({
            "instruction": "question",
            "output": "answer"
        })),
        "training_run_create" => Some(json!({
            "model_id": "mistral-7b-v02",
            "dataset_id": "4f5c2a1e-8d4b-4f6e-9a51-3c2d1e0f9b87",
            "config": {
                "epochs": 3,
                "learning_rate": 0.0001,
                "fine_tune_type": "qlora",
                "lora_rank": 16,
                "quantization_bits": 4
            }
        })),
        "endpoint_create" => Some(json!({
            "training_run_id": "8b0e6f2c-5d7a-4a3b-9c1e-2f4d6a8b0c1d",
            "name": "support-bot-prod",
            "instance_count": 1
        })),
        "endpoint_update" => Some(json!({ "status": "inservice" })),
        "endpoint_invoke" => Some(json!({
            "messages": [{ "role": "user", "content": "How do I reset my password?" }],
            "max_tokens": 256
        })),
        "research_create" => Some(json!({
            "question": "When does QLoRA beat full fine-tuning?",
            "depth": "in-depth",
            "output_format": "report"
        })),
        "assistant_chat" => Some(json!({
            "messages": [{ "role": "user", "content": "What LoRA rank should I use?" }]
        })),
        _ => None,
    }
}

fn response_example(key: &str) -> Option<Value> {
    match key {
        "health" => Some(json!({ "status": "healthy", "version": "0.1.0" })),
        "auth_user" => Some(json!({
            "success": true,
            "data": example_user()
        })),
        "auth_session" => Some(json!({
            "success": true,
            "data": {
                "token": "eyJhbGciOiJIUzI1NiJ9.example.signature",
                "user": example_user()
            }
        })),
        "auth_token" => Some(json!({
            "access_token": "eyJhbGciOiJIUzI1NiJ9.example.signature",
            "token_type": "bearer"
        })),
        "project" => Some(json!({ "success": true, "data": example_project() })),
        "project_page" => Some(json!({
            "success": true,
            "data": {
                "items": [example_project()],
                "total": 1,
                "page": 1,
                "page_size": 10,
                "has_more": false
            }
        })),
        "dataset" => Some(json!({
            "success": true,
            "data": {
                "id": "4f5c2a1e-8d4b-4f6e-9a51-3c2d1e0f9b87",
                "project_id": "0d9a7c3e-2b1f-4e5d-8c6a-9b0e1f2d3c4a",
                "name": "transcripts",
                "file_name": "transcripts.jsonl",
                "format": "jsonl",
                "s3_uri": "s3://llm-toolkit-datasets/0d9a7c3e-2b1f-4e5d-8c6a-9b0e1f2d3c4a/4f5c2a1e-8d4b-4f6e-9a51-3c2d1e0f9b87/transcripts.jsonl",
                "row_count": 2547,
                "column_mapping": {},
                "validation_status": "valid",
                "validation_errors": [],
                "estimated_tokens": 1_250_000,
                "created_at": "2026-01-05T12:00:00Z"
            }
        })),
        "dataset_validation" => Some(json!({
            "success": true,
            "data": {
                "is_valid": true,
                "total_rows": 2547,
                "estimated_tokens": 1_250_000,
                "errors": [],
                "warnings": ["15 rows exceed 2048 tokens and will be truncated"],
                "detected_columns": ["instruction", "input", "output"]
            }
        })),
        "training_logs" => Some(json!({
            "success": true,
            "data": {
                "logs": [
                    { "timestamp": "2024-01-15T10:00:00Z", "message": "Training job started" }
                ]
            }
        })),
        "training_metrics" => Some(json!({
            "success": true,
            "data": {
                "loss_history": [
                    { "step": 100, "train_loss": 2.5, "eval_loss": 2.6 }
                ]
            }
        })),
        "endpoint_invoke" => Some(json!({
            "success": true,
            "data": {
                "response": "This is a mock response to: How do I reset my password?...",
                "usage": { "prompt_tokens": 50, "completion_tokens": 100, "total_tokens": 150 }
            }
        })),
        "assistant_chat" => Some(json!({
            "success": true,
            "data": { "response": "**LoRA (Low-Rank Adaptation)** is a parameter-efficient fine-tuning technique that: ..." }
        })),
        _ => None,
    }
}

fn example_user() -> Value {
    json!({
        "id": "6c1f3e2a-7b9d-4c8e-a1f0-5d2b3c4e6f70",
        "email": "ada@example.com",
        "name": "Ada Lovelace",
        "organization": null,
        "default_region": "us-east-1",
        "created_at": "2026-01-05T12:00:00Z"
    })
}

fn example_project() -> Value {
    json!({
        "id": "0d9a7c3e-2b1f-4e5d-8c6a-9b0e1f2d3c4a",
        "user_id": "6c1f3e2a-7b9d-4c8e-a1f0-5d2b3c4e6f70",
        "name": "Support bot",
        "description": "Fine-tune on support transcripts",
        "type": "fine-tune",
        "tags": ["support", "chat"],
        "aws_region": "us-east-1",
        "s3_bucket": "llm-toolkit-6c1f3e2a-0d9a7c3e",
        "created_at": "2026-01-05T12:00:00Z",
        "updated_at": "2026-01-05T12:00:00Z"
    })
}
