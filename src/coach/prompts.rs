use serde_json::{json, Value};

pub(crate) fn suggestion_prompt(transcript: &str) -> String {
    format!(
        "You are an expert Hotel Reservation Coach assisting a trainee agent.

Current Conversation Transcript:
{transcript}

Task: Provide 3 distinct, professional, and concise phrases the Agent should say next to move the booking forward, answer questions, or be polite.
If the customer is angry, suggest de-escalation phrases.
Return ONLY a JSON array of strings. Example: [\"Phrase 1\", \"Phrase 2\", \"Phrase 3\"]"
    )
}

pub(crate) fn suggestion_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": { "type": "STRING" }
    })
}

pub(crate) fn evaluation_prompt(transcript: &str, booking_json: &str) -> String {
    format!(
        "You are a Hotel Quality Assurance Manager evaluating a trainee.

TRANSCRIPT OF CALL:
{transcript}

BOOKING SUBMITTED BY AGENT:
{booking_json}

TASK:
Evaluate the Agent's performance.
1. Compare the booking details (Dates, Guests, Room) against what the customer asked for in the transcript.
2. Rate professionalism and friendliness.
3. Did they handle the customer's persona well?
4. If the customer was IRATE/ANGRY, did the agent de-escalate well?

OUTPUT JSON:
{{
  \"score\": number (0-100),
  \"summary\": \"Short paragraph summary of performance\",
  \"strengths\": [\"point 1\", \"point 2\"],
  \"areasForImprovement\": [\"point 1\", \"point 2\"],
  \"bookingAccuracy\": \"Perfect\" | \"Good\" | \"Needs Work\"
}}"
    )
}

pub(crate) fn evaluation_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "score": { "type": "NUMBER" },
            "summary": { "type": "STRING" },
            "strengths": { "type": "ARRAY", "items": { "type": "STRING" } },
            "areasForImprovement": { "type": "ARRAY", "items": { "type": "STRING" } },
            "bookingAccuracy": { "type": "STRING", "enum": ["Perfect", "Good", "Needs Work"] }
        },
        "required": ["score", "summary", "strengths", "areasForImprovement", "bookingAccuracy"]
    })
}
