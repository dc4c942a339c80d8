//! A small parser for InfluxDB's annotated-CSV query response, just
//! enough to pull `(entity_id, domain, _field, _value)` rows out of a
//! Flux `aggregateWindow` result for the downsampler/tier-mover jobs.
//! Not a general Flux/CSV implementation — annotation lines (`#...`) and
//! unrecognized columns are ignored.

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AggregateRow {
    pub entity_id: String,
    pub domain: String,
    pub field: String,
    pub value: f64,
}

pub fn parse_aggregate_rows(csv: &str) -> Vec<AggregateRow> {
    let mut header: Option<Vec<&str>> = None;
    let mut rows = Vec::new();

    for line in csv.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let columns: Vec<&str> = line.split(',').map(str::trim).collect();
        if header.is_none() {
            header = Some(columns);
            continue;
        }

        let header = header.as_ref().unwrap();
        let get = |name: &str| -> Option<&str> {
            header
                .iter()
                .position(|h| *h == name)
                .and_then(|idx| columns.get(idx))
                .copied()
        };

        let (Some(entity_id), Some(domain), Some(field), Some(value)) =
            (get("entity_id"), get("domain"), get("_field"), get("_value"))
        else {
            continue;
        };

        if let Ok(value) = value.parse::<f64>() {
            rows.push(AggregateRow {
                entity_id: entity_id.to_string(),
                domain: domain.to_string(),
                field: field.to_string(),
                value,
            });
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_and_skips_annotation_lines() {
        let csv = "#datatype,string,long,dateTime:RFC3339,string,string,string,double\n\
                   ,result,table,_time,entity_id,domain,_field,_value\n\
                   ,_result,0,2025-01-02T03:00:00Z,light.kitchen,light,mean,21.5\n";
        let rows = parse_aggregate_rows(csv);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entity_id, "light.kitchen");
        assert_eq!(rows[0].value, 21.5);
    }

    #[test]
    fn ignores_rows_missing_required_columns() {
        let csv = "a,b\nx,y\n";
        assert!(parse_aggregate_rows(csv).is_empty());
    }
}
