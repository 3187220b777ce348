use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, Table};
use polystats_core::Aggregate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
    Table,
}

pub fn render(aggregate: &Aggregate, format: OutputFormat) -> anyhow::Result<String> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(aggregate)?,
        OutputFormat::Yaml => serde_yaml::to_string(aggregate)?,
        OutputFormat::Table => render_table(aggregate).to_string(),
    };
    Ok(rendered)
}

fn render_table(aggregate: &Aggregate) -> Table {
    let bbox = if aggregate.bbox.is_empty() {
        "empty".to_string()
    } else {
        let b = &aggregate.bbox;
        format!("({}, {}) - ({}, {})", b.x1, b.y1, b.x2, b.y2)
    };

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Bbox".to_string(), bbox]);
    table.add_row(vec!["Max Weight".to_string(), format!("{:.3}", aggregate.max_weight)]);
    table.add_row(vec![
        "Heavy Polygons".to_string(),
        aggregate.heavy_count().to_string(),
    ]);

    for (index, polygon) in aggregate.heavy_indices().zip(aggregate.heavy_polygons()) {
        table.add_row(vec![
            format!("  #{}", index),
            format!("{} points, weight {:.3}", polygon.len(), polygon.weight_sum()),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystats_core::{Polygon, Task, WeightedPoint};

    fn example() -> Aggregate {
        let tasks = Task::from_polygons(vec![
            Polygon::new(vec![
                WeightedPoint::new(0, 0, 60.0),
                WeightedPoint::new(2, 2, 50.0),
            ]),
            Polygon::new(vec![WeightedPoint::new(-1, 5, 10.0)]),
        ]);
        Aggregate::from_tasks(&tasks)
    }

    #[test]
    fn test_json_keys() {
        let rendered = render(&example(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["Bbox"]["x1"], -1);
        assert_eq!(value["Bbox"]["y2"], 5);
        assert_eq!(value["MaxWeight"], 110.0);
        assert_eq!(value["HeavyPolygons"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_yaml_output() {
        let rendered = render(&example(), OutputFormat::Yaml).unwrap();

        assert!(rendered.contains("MaxWeight: 110.0"));
        assert!(rendered.contains("HeavyPolygons:"));
    }

    #[test]
    fn test_table_output() {
        let rendered = render(&example(), OutputFormat::Table).unwrap();
        assert!(rendered.contains("(-1, 0) - (2, 5)"));
        assert!(rendered.contains("#0"));

        let empty = render(&Aggregate::new(), OutputFormat::Table).unwrap();
        assert!(empty.contains("empty"));
    }
}
