//! Sample catalog shared by unit tests.

use serde_json::{Value, json};

use super::ToolSchema;

/// A catalog over the Airbnb sample dataset with one tool of every kind.
pub fn sample_record() -> Value {
    json!({
        "_id": {"$oid": "65f0c0ffee00000000000001"},
        "name": "airbnb",
        "module_info": {
            "database": "sample_airbnb",
            "collection": "listingsAndReviews",
            "title": "Airbnb listings",
            "description": "Search and explore Airbnb listings."
        },
        "tools": {
            "vector_search": {
                "description": "Find listings semantically similar to a description.",
                "required": ["query_text"],
                "returns": "Listings ordered by similarity, with a score.",
                "index": "listing_vector_index",
                "vector_path": "text_embeddings",
                "projection": {"_id": 0, "name": 1, "summary": 1, "address.market": 1},
                "parameters": {
                    "query_text": {
                        "type": "string",
                        "constraints": "len >= 1",
                        "description": "What to look for."
                    },
                    "limit": {
                        "type": "integer",
                        "default": 10,
                        "constraints": "1 <= value <= 50",
                        "description": "Number of listings to return."
                    },
                    "num_candidates": {
                        "type": "integer",
                        "default": 100,
                        "constraints": {"ge": 1, "le": 500},
                        "description": "Candidate pool size."
                    },
                    "filters": {
                        "type": "list",
                        "description": "Equality filters as [field, value] pairs."
                    }
                }
            },
            "text_search": {
                "description": "Keyword search over listing text.",
                "required": ["query_text"],
                "index": "default",
                "fields_searched": ["name", "summary", "description"],
                "projection": {"name": 1, "summary": 1},
                "parameters": {
                    "query_text": {"type": "string", "description": "Keywords."},
                    "limit": {
                        "type": "integer",
                        "default": 5,
                        "constraints": "1 <= value <= 20",
                        "description": "Number of listings to return."
                    }
                }
            },
            "get_unique_values": {
                "description": "List the distinct values of a field.",
                "required": ["field"],
                "parameters": {
                    "field": {"type": "string", "description": "Dotted field path."}
                }
            },
            "aggregate_query": {
                "description": "Run an aggregation pipeline.",
                "required": ["pipeline"],
                "parameters": {
                    "pipeline": {
                        "type": "list",
                        "constraints": "len >= 1",
                        "description": "Pipeline stages."
                    },
                    "limit": {
                        "type": "integer",
                        "constraints": "1 <= value <= 100",
                        "description": "Maximum number of documents."
                    }
                }
            },
            "collection_info": {
                "description": "Describe the listings collection."
            }
        }
    })
}

pub fn sample_schema() -> ToolSchema {
    ToolSchema::from_document(sample_record()).expect("sample record builds")
}
