//! Prompt text for quote extraction.
//!
//! Kept apart from [`crate::oracle`] so rule changes never touch transport
//! or parsing code, and so tests can inspect the rules directly.

/// System message sent ahead of every extraction prompt.
pub const SYSTEM_PROMPT: &str = "You are a precise financial data extractor specializing in hotel quotes. \
You must calculate guestroom totals when not explicitly provided. \
Return only valid JSON with no additional text or formatting.";

const EXTRACTION_RULES: &str = r#"You are a hotel quote financial data extractor. Parse the hotel quote content below and extract the following values.

Return ONLY valid JSON with exactly these keys:
{
  "guestroomTotal": number | null,
  "meetingRoomTotal": number | null,
  "foodBeverageTotal": number | null,
  "confidence": number between 0 and 1,
  "aiNotes": "brief explanation of what was found or any issues",
  "calculationBreakdown": {
    "roomRate": number | null,
    "roomsPerNight": number | null,
    "numberOfNights": number | null,
    "calculatedTotal": number | null
  }
}

EXTRACTION RULES:
- Extract bare numbers only: remove $, commas, and any other currency symbols.
- Use null when a category is not found or is explicitly $0.
- Do not extract an overall quote total. Extract the individual components only.

COMPLIMENTARY vs MINIMUM:
- Anything described as "complimentary", "free", "included", or "no charge" is not a cost: extract it as null, never 0, and never omit the key.
- An F&B "minimum" is a required spend: extract the minimum amount as foodBeverageTotal.
- Meeting space that is "complimentary with F&B minimum" is free: meetingRoomTotal is null.
- Never count a minimum as both a meeting room cost and an F&B cost.

GUESTROOM TOTAL:
1. First look for an explicitly stated guestroom total.
2. If none is stated, calculate Room Rate x Rooms per Night x Number of Nights.
3. Room rate terms: "rate", "room rate", "nightly rate", "ROH rate", "group rate".
4. Room count terms: "rooms", "guestrooms", "room nights", "total rooms".
5. Derive the number of nights from the check-in and check-out dates.
6. Report roomRate, roomsPerNight, numberOfNights, and calculatedTotal in calculationBreakdown.
7. When you calculate the total, use the calculated amount as guestroomTotal.

MEETING ROOM TOTAL:
- Meeting room, conference room, function space, and event space RENTAL FEES.
- Ignore items labeled "complimentary", "free", "included", or "no charge".

FOOD & BEVERAGE TOTAL:
- F&B, food & beverage, catering, and meal COSTS (breakfast, lunch, dinner).
- Include F&B minimums ("F&B minimum", "food & beverage minimum", "catering minimum").

EXAMPLES:
- "Complimentary meeting space with $50,000 F&B minimum" -> meetingRoomTotal: null, foodBeverageTotal: 50000
- "$5,000 meeting room rental + $30,000 F&B minimum" -> meetingRoomTotal: 5000, foodBeverageTotal: 30000
- "Free breakfast included" -> foodBeverageTotal: null (unless other F&B costs exist)

VALIDATION:
- When a category has several line items, sum them.
- confidence reflects your certainty (1.0 very certain, 0.5 somewhat certain, 0.2 low certainty).
- Use aiNotes to explain your reasoning, especially for complimentary items and minimums."#;

/// Builds the user message embedding `combined_text` verbatim.
pub fn build_extraction_prompt(combined_text: &str) -> String {
    format!(
        "{}\n\nContent to parse:\n\"\"\"\n{}\n\"\"\"\n",
        EXTRACTION_RULES, combined_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_content_verbatim() {
        let content = "Room rate $200 x 50 rooms x 3 nights";
        let prompt = build_extraction_prompt(content);
        assert!(prompt.contains("Content to parse:\n\"\"\"\nRoom rate $200 x 50 rooms x 3 nights\n\"\"\""));
    }

    #[test]
    fn prompt_states_complimentary_rule() {
        let prompt = build_extraction_prompt("");
        assert!(prompt.contains("extract it as null, never 0"));
        assert!(prompt.contains("meetingRoomTotal: null, foodBeverageTotal: 50000"));
        for key in ["guestroomTotal", "meetingRoomTotal", "foodBeverageTotal", "calculationBreakdown"] {
            assert!(prompt.contains(key), "missing key {}", key);
        }
    }
}
