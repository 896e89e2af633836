// src/sources/us_mn.rs
//! Minnesota, by county. The state total is left to the rollup.

use crate::core::html::{body_rows, table_with_header};
use crate::core::parse::optional_number;
use crate::errors::{RegistryError, TaskError};
use crate::record::{Level, Record};
use crate::sources::arcgis;
use crate::task::{RawResult, Task, TaskContext, TaskIdentity};

const SITUATION_PAGE: &str = "https://www.health.state.mn.us/diseases/coronavirus/situation.html";
const ARCGIS_LAYER: &str = "https://services1.arcgis.com/RQG3sksSXcoDoIfj/arcgis/rest/services/MN_COVID19_County_Tracking_Public_View/FeatureServer/0/query";

pub const COUNTIES: [&str; 87] = [
    "Aitkin County", "Anoka County", "Becker County", "Beltrami County", "Benton County",
    "Big Stone County", "Blue Earth County", "Brown County", "Carlton County", "Carver County",
    "Cass County", "Chippewa County", "Chisago County", "Clay County", "Clearwater County",
    "Cook County", "Cottonwood County", "Crow Wing County", "Dakota County", "Dodge County",
    "Douglas County", "Faribault County", "Fillmore County", "Freeborn County", "Goodhue County",
    "Grant County", "Hennepin County", "Houston County", "Hubbard County", "Isanti County",
    "Itasca County", "Jackson County", "Kanabec County", "Kandiyohi County", "Kittson County",
    "Koochiching County", "Lac qui Parle County", "Lake County", "Lake of the Woods County",
    "Le Sueur County", "Lincoln County", "Lyon County", "McLeod County", "Mahnomen County",
    "Marshall County", "Martin County", "Meeker County", "Mille Lacs County", "Morrison County",
    "Mower County", "Murray County", "Nicollet County", "Nobles County", "Norman County",
    "Olmsted County", "Otter Tail County", "Pennington County", "Pine County", "Pipestone County",
    "Polk County", "Pope County", "Ramsey County", "Red Lake County", "Redwood County",
    "Renville County", "Rice County", "Rock County", "Roseau County", "St. Louis County",
    "Scott County", "Sherburne County", "Sibley County", "Stearns County", "Steele County",
    "Stevens County", "Swift County", "Todd County", "Traverse County", "Wabasha County",
    "Wadena County", "Waseca County", "Washington County", "Watonwan County", "Wilkin County",
    "Winona County", "Wright County", "Yellow Medicine County",
];

pub fn task() -> Result<Task, RegistryError> {
    Task::new(TaskIdentity::state("iso1:US", "iso2:US-MN"), situation_table)
        .source("https://www.health.state.mn.us/", "Minnesota Department of Health")
        .source(SITUATION_PAGE, "Minnesota Department of Health")
        .known_regions(COUNTIES)
        .aggregate(Level::County)
        .since("2020-03-30", arcgis_layer)
}

fn situation_table(ctx: &TaskContext) -> Result<RawResult, TaskError> {
    let doc = ctx.page(SITUATION_PAGE, "default")?;
    Ok(RawResult::Many(parse_situation(&doc)?))
}

/// County name in the first cell, case count in the last. A blank count
/// is zero on this page.
pub fn parse_situation(doc: &str) -> Result<Vec<Record>, TaskError> {
    let table = table_with_header(doc, "County").ok_or_else(|| TaskError::exec("county table not found"))?;
    let mut counties = Vec::new();
    for row in body_rows(table) {
        let (Some(name), Some(last)) = (row.first(), row.last()) else { continue };
        if name.is_empty() || name.to_lowercase().contains("total") {
            continue;
        }
        let cases = optional_number(last)?.unwrap_or(0.0);
        counties.push(record! { county: name.as_str(), cases: cases });
    }
    Ok(counties)
}

fn arcgis_layer(ctx: &TaskContext) -> Result<RawResult, TaskError> {
    let data = arcgis::query_layer(ctx, ARCGIS_LAYER, "default")?;
    Ok(RawResult::Many(parse_layer(&data)?))
}

/// `CTY_NAME`/`COVID19POS`; a blank count reads as zero, as the layer does.
pub fn parse_layer(data: &serde_json::Value) -> Result<Vec<Record>, TaskError> {
    arcgis::attributes(data)?
        .into_iter()
        .map(|item| {
            let name = arcgis::text(item, "CTY_NAME")?;
            Ok(record! { county: name, cases: arcgis::count(item, "COVID19POS") })
        })
        .collect()
}
