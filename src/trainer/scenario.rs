use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Base persona for the simulated caller
pub const SYSTEM_INSTRUCTION: &str = r#"
You are roleplaying as a potential customer calling the "Grand AceReyes Hotel" to make a hotel reservation.
The user you are speaking to is a trainee Reservation Agent.

Your Goal: To book a room that fits your specific needs, or to ask questions about the hotel facilities.

Guidelines:
1. **Persona**: Choose a persona at the start of the call (e.g., "Busy Business Traveler", "Couple on Honeymoon", "Balikbayan Family", or "Confused Elderly Person"). Do not explicitly state your persona, just act like it.
2. **Needs**: Have specific requirements in mind (e.g., "I need a King bed", "Must have ocean view", "Is breakfast included?").
3. **Pacing**: Do not give all information at once. Wait for the agent to ask the right questions (Dates, Number of guests, Room preferences).
4. **Conflict**: If the agent offers something that doesn't match your needs, politely correct them or ask for alternatives. If they are helpful, show appreciation.
5. **Tone**: Start neutral. If the agent is slow or rude, get slightly impatient. If they are efficient, become friendlier.
6. **Ending**: If satisfied, say "That sounds perfect, let's book it." If not, say "I'll think about it and call back."

Current Hotel Info for your reference (do not read this out, just know it):
- We have a pool, gym, and spa.
- Currency is Philippine Peso (PHP / ₱).
- Breakfast is ₱950 extra per person unless included in a Suite.
- Check-in is 2 PM, Check-out is 12 PM (Standard PH Hotel times).
- Prices are subject to 12% VAT.
"#;

/// Appended when the caller should speak Tagalog
pub const TAGALOG_INSTRUCTION: &str = r#"
IMPORTANT LANGUAGE REQUIREMENT:
- You are a Filipino customer.
- You MUST speak primarily in Tagalog (Filipino).
- You may use "Taglish" (mixing English words naturally), which is common in the Philippines, especially for dates, prices, or technical terms.
- Act like a local calling within the Philippines.
"#;

/// Appended for the difficult-caller drill
pub const IRATE_INSTRUCTION: &str = r#"
IMPORTANT BEHAVIOR:
- You are an IRATE, ANGRY, and DIFFICULT customer.
- Tone: Impatient, annoyed, and demanding.
- Behavior: Sigh often, complain about being on hold, or complain about previous bad experiences with the hotel.
- Interrupt the agent if they speak too long.
- Challenge the prices ("Ang mahal naman!").
- GOAL: You will only calm down and book if the agent shows extreme empathy, apologizes, and offers a quick solution. Otherwise, remain difficult.
"#;

/// First suggestion shown once the call connects
pub const GREETING: &str =
    "Greetings! Thank you for calling Grand AceReyes Hotel. How may I assist you?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoicePreset {
    pub name: &'static str,
    pub gender: &'static str,
}

pub const VOICE_PRESETS: [VoicePreset; 4] = [
    VoicePreset { name: "Fenrir", gender: "Male" },
    VoicePreset { name: "Kore", gender: "Female" },
    VoicePreset { name: "Puck", gender: "Male" },
    VoicePreset { name: "Aoede", gender: "Female" },
];

/// Toggles chosen by the trainee before a call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioOptions {
    pub tagalog: bool,
    pub irate: bool,
    /// Fixed voice; a random preset when absent
    pub voice: Option<String>,
}

impl ScenarioOptions {
    pub fn instruction(&self) -> String {
        let mut instruction = SYSTEM_INSTRUCTION.to_string();
        if self.tagalog {
            instruction.push_str("\n\n");
            instruction.push_str(TAGALOG_INSTRUCTION);
        }
        if self.irate {
            instruction.push_str("\n\n");
            instruction.push_str(IRATE_INSTRUCTION);
        }
        instruction
    }

    /// Resolve the voice, picking a preset at random if none was requested.
    ///
    /// Returns `None` if the requested voice is not a preset.
    pub fn voice<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&'static str> {
        match &self.voice {
            Some(requested) => VOICE_PRESETS
                .iter()
                .find(|preset| preset.name.eq_ignore_ascii_case(requested))
                .map(|preset| preset.name),
            None => VOICE_PRESETS.choose(rng).map(|preset| preset.name),
        }
    }
}
