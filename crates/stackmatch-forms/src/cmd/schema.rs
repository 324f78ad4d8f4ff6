use anyhow::Result;
use rfq_form_spec::blueprint_schema;

use super::print_json;

pub fn run() -> Result<()> {
    print_json(&blueprint_schema())
}
