//! Routes command - list the ordered route table

use anyhow::Result;
use console_router::route::{BodyShape, RequestShape};
use console_router::{Route, RequestRouter};
use serde::Serialize;
use tabled::Tabled;

use crate::output::OutputContext;

#[derive(Tabled, Serialize)]
pub struct RouteRow {
    #[tabled(rename = "#")]
    pub order: usize,
    #[tabled(rename = "Route")]
    pub name: String,
    #[tabled(rename = "Matches")]
    pub predicate: String,
    #[tabled(rename = "Backend")]
    pub backend: String,
    #[tabled(rename = "Request")]
    pub request: String,
    #[tabled(rename = "Unwrap")]
    pub unwrap: String,
}

impl RouteRow {
    fn new(order: usize, route: &Route) -> Self {
        Self {
            order,
            name: route.name.to_string(),
            predicate: route.predicate.to_string(),
            backend: route.backend.to_string(),
            request: describe_request(&route.request),
            unwrap: route.unwrap.to_string(),
        }
    }
}

fn describe_request(request: &RequestShape) -> String {
    match request {
        RequestShape::Get => "GET <key[0]>".to_string(),
        RequestShape::Stream => "GET sse/<key[0]> (event-stream)".to_string(),
        RequestShape::Post(BodyShape::Field(field)) => {
            format!("POST <key[0]> {{{}: key[1]}}", field)
        }
        RequestShape::Post(BodyShape::RegexExamples) => {
            "POST <key[0]> {regex: key[1], examples: true}".to_string()
        }
    }
}

pub fn routes(router: &RequestRouter, ctx: &OutputContext) -> Result<()> {
    let context = router.context();
    ctx.info(&format!(
        "local={} mocked_endpoints=[{}]",
        context.local,
        context.mocked_prefixes.join(", ")
    ));

    let rows: Vec<RouteRow> = router
        .routes()
        .iter()
        .enumerate()
        .map(|(i, route)| RouteRow::new(i + 1, route))
        .collect();
    ctx.print(&rows);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use console_router::RouteTable;

    #[test]
    fn test_rows_follow_table_order() {
        let table = RouteTable::standard();
        let rows: Vec<RouteRow> = table
            .routes()
            .iter()
            .enumerate()
            .map(|(i, r)| RouteRow::new(i + 1, r))
            .collect();

        assert_eq!(rows[0].name, "mocked");
        assert_eq!(rows[0].backend, "mocked");
        assert_eq!(rows.last().unwrap().name, "default");
        assert_eq!(rows.last().unwrap().order, rows.len());
    }

    #[test]
    fn test_describe_request() {
        assert_eq!(
            describe_request(&RequestShape::Post(BodyShape::Field("slot"))),
            "POST <key[0]> {slot: key[1]}"
        );
        assert_eq!(
            describe_request(&RequestShape::Stream),
            "GET sse/<key[0]> (event-stream)"
        );
    }
}
