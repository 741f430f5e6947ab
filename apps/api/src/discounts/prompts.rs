// Discount extraction prompt text.
// Placeholders: {charge} is the raw charge value, {band} the resolved band label,
// {<table key>} the fence-stripped response of an earlier step in the same chain.

// ── Band resolution ────────────────────────────────────────────────────────

pub const BAND_QUERY_TEMPLATE: &str = r#"Use the attached contract to find the table. If there are multiple tables, use the first table.

Requirements:
1. Analyze the weekly charges band ranges in the table
2. The first range has the minimum value as 0
3. Find the range where *{charge}* falls
4. Match criteria: min value <= *{charge}* <= max value
5. If no exact range is found, return the highest possible range

Output Format:
{
    "weeklyChargesBand": "EXACT_RANGE_FOUND"
}"#;

/// Charge value used in the one-shot band example.
pub const BAND_EXAMPLE_CHARGE: &str = "16,856";

pub const BAND_EXAMPLE_RESPONSE: &str =
    "```json\n{\n  \"weeklyChargesBand\": \"0.01 - 19,429.99\"\n}\n```";

// ── Extraction one-shot example (shared by every chain session) ─────────────

pub const EXTRACTION_EXAMPLE_QUERY: &str = "Use the attached contract to fill the table. the weekly charges band is {band}. DOMESTIC AIR SERVICE LEVEL WEIGHT RANGE CURRENT UPS\nNext Day Air Letter All\nNext Day Air Package All\nNext Day Air Saver Letter All\nNext Day Air Saver Package All\n2nd Day AM Letter All\n2nd Day AM Package All\n2nd Day Air Letter All\n2nd Day Air Package All\n3 Day Select Package All\nNext Day Air CWT All\nNext Day Air Saver CWT All\n2nd Day Air AM CWT All\n2nd Day Air CWT All\n3 Day Select CWT All";

pub const EXTRACTION_EXAMPLE_RESPONSE: &str = "```json\n{\"Domestic Air Service Level\": {\"Next Day Air\": {\"Letter\": {\"Weight Range\": \"All\", \"Current UPS\": \"61.00%\"}, \"Package\": {\"Weight Range\": \"All\", \"Current UPS\": \"61.00%\"}}, \"Next Day Air Saver\": {\"Letter\": {\"Weight Range\": \"All\", \"Current UPS\": \"61.00%\"}, \"Package\": {\"Weight Range\": \"All\", \"Current UPS\": \"61.00%\"}}, \"2nd Day AM\": {\"Letter\": {\"Weight Range\": \"All\", \"Current UPS\": \"59.00%\"}, \"Package\": {\"Weight Range\": \"All\", \"Current UPS\": \"59.00%\"}}, \"2nd Day Air\": {\"Letter\": {\"Weight Range\": \"All\", \"Current UPS\": \"59.00%\"}, \"Package\": {\"Weight Range\": \"All\", \"Current UPS\": \"59.00%\"}}, \"3 Day Select\": {\"Package\": {\"Weight Range\": \"All\", \"Current UPS\": \"51.00%\"}}, \"Next Day Air CWT\": {\"Weight Range\": \"All\", \"Current UPS\": null}, \"Next Day Air Saver CWT\": {\"Weight Range\": \"All\", \"Current UPS\": null}, \"2nd Day AM CWT\": {\"Weight Range\": \"All\", \"Current UPS\": null}, \"2nd Day Air CWT\": {\"Weight Range\": \"All\", \"Current UPS\": null}, \"3 Day Select CWT\": {\"Weight Range\": \"All\", \"Current UPS\": null}}}\n```";

// ── Step instructions (the table skeleton is appended by render_prompt) ─────

pub const DOMESTIC_AIR_INSTRUCTION: &str = "Use the attached contract to fill the table. return in a json format and only the json of the table and nothing else. the weekly charges band is {band}.";

pub const ACCESSORIALS_INSTRUCTION: &str = "Use the attached contract to fill the current UPS. All the accesorials and incentives are listed in the attached contract. the weekly charges band is {band}. return in a json format and only the json of the table and nothing else. if current_ups not found for a particular accesorial charge return null";

pub const DOMESTIC_GROUND_PORTFOLIO_INSTRUCTION: &str = "Use the attached contract to populate the table. Focus only on the weekly charge bands ($) range of {band} from the portfolio tier incentive table. only get the values from the portfolio tier incentive table for the correct weekly charge bands. Return the result in JSON format, containing only the table data and nothing else.";

pub const DOMESTIC_GROUND_INCENTIVES_OFF_INSTRUCTION: &str = "Use the attached contract to populate the table. Focus only on the weekly charge bands ($) range of {band} from the portfolio tier incentive table. Return the result in JSON format, containing only the table data and nothing else.";

pub const DOMESTIC_GROUND_CWT_INSTRUCTION: &str = "Use the attached contract to fill the table. return in a json format and only the json of the table and nothing else. there should be 2 rows. commodity tier is in addendum 1. the weekly charges band is {band}.";

pub const INTERNATIONAL_CURRENT_INSTRUCTION: &str = "Use the attached contract to fill the table. The weekly charges bands ($) is {band}. (please return values related to this alone). return in a json format and only the json of the table and nothing else.";

pub const INTERNATIONAL_INCENTIVES_OFF_INSTRUCTION: &str = "Use the attached contract to fill the table. The weekly charges bands ($) is {band}. return in a json format and only the json of the table and nothing else.";

pub const INTERNATIONAL_CONSOLIDATE_INSTRUCTION: &str = "Use the attached contract to fill the table. The weekly charges bands ($) is {band}. return in a json format and only the json of the table and nothing else. add values from {international1} and the corresponding incentive off values from {international2}. add corresponding values to a consolidated table of this json format:";
