//! Live streaming protocol messages.
//!
//! Client messages (sent to server):
//! - setup - model, voice, system instruction, transcription switches
//! - realtimeInput - one base64 PCM microphone frame
//!
//! Server messages (received from server):
//! - setupComplete - setup accepted
//! - serverContent - model audio, interruption, transcription deltas, turn end
//! - goAway - server is about to close the stream
//!
//! All messages are camelCase JSON; the server may deliver them in either
//! text or binary WebSocket frames.

use serde::{Deserialize, Serialize};

use crate::audio::WireBlob;

// =============================================================================
// Client Messages
// =============================================================================

/// Messages sent to the live endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(Setup),
    RealtimeInput(RealtimeInput),
}

impl ClientMessage {
    /// Wrap one encoded microphone frame.
    pub fn audio(blob: WireBlob) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput {
            media_chunks: vec![blob],
        })
    }
}

/// First message on a new stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    /// Fully qualified model name (`models/...`)
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    /// Present and empty to enable transcription of microphone audio
    pub input_audio_transcription: AudioTranscriptionConfig,
    /// Present and empty to enable transcription of model audio
    pub output_audio_transcription: AudioTranscriptionConfig,
}

impl Setup {
    /// Audio-only responses with both transcription directions enabled.
    pub fn audio(model: &str, voice_name: &str, system_instruction: &str) -> Self {
        let model = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };

        Self {
            model,
            generation_config: GenerationConfig {
                response_modalities: vec![Modality::Audio],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice_name.to_string(),
                        },
                    },
                },
            },
            system_instruction: Content::text(system_instruction),
            input_audio_transcription: AudioTranscriptionConfig {},
            output_audio_transcription: AudioTranscriptionConfig {},
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<Modality>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    Audio,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioTranscriptionConfig {}

/// Text content wrapper used for the system instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<TextPart>,
}

impl Content {
    pub fn text(text: &str) -> Self {
        Self {
            parts: vec![TextPart {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
}

/// Streamed microphone audio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<WireBlob>,
}

// =============================================================================
// Server Messages
// =============================================================================

/// One message from the live endpoint. Fields are independent and any
/// combination may be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_complete: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_content: Option<ServerContent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go_away: Option<GoAway>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_turn: Option<ModelTurn>,

    #[serde(default)]
    pub interrupted: bool,

    #[serde(default)]
    pub turn_complete: bool,

    /// Transcription of the microphone (agent) audio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_transcription: Option<Transcription>,

    /// Transcription of the model (customer) audio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_transcription: Option<Transcription>,
}

impl ServerContent {
    /// Base64 audio carried by the first part of the model turn.
    pub fn audio_data(&self) -> Option<&str> {
        self.model_turn
            .as_ref()?
            .parts
            .first()?
            .inline_data
            .as_ref()
            .map(|blob| blob.data.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<WireBlob>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoAway {
    #[serde(default)]
    pub time_left: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_setup_wire_shape() {
        let msg = ClientMessage::Setup(Setup::audio("live-model", "Puck", "Be a guest."));
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(
            value,
            json!({
                "setup": {
                    "model": "models/live-model",
                    "generationConfig": {
                        "responseModalities": ["AUDIO"],
                        "speechConfig": {
                            "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": "Puck" } }
                        }
                    },
                    "systemInstruction": { "parts": [{ "text": "Be a guest." }] },
                    "inputAudioTranscription": {},
                    "outputAudioTranscription": {}
                }
            })
        );
    }

    #[test]
    fn test_audio_frame_wire_shape() {
        let msg = ClientMessage::audio(WireBlob {
            data: "AAE=".to_string(),
            mime_type: "audio/pcm;rate=16000".to_string(),
        });
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(
            value,
            json!({
                "realtimeInput": {
                    "mediaChunks": [{ "data": "AAE=", "mimeType": "audio/pcm;rate=16000" }]
                }
            })
        );
    }

    #[test]
    fn test_server_content_all_signals() {
        let raw = r#"{
            "serverContent": {
                "modelTurn": { "parts": [{ "inlineData": { "mimeType": "audio/pcm;rate=24000", "data": "AAA=" } }] },
                "interrupted": true,
                "turnComplete": true,
                "inputTranscription": { "text": "hello" },
                "outputTranscription": { "text": "hi" }
            }
        }"#;

        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        let content = msg.server_content.unwrap();
        assert_eq!(content.audio_data(), Some("AAA="));
        assert!(content.interrupted);
        assert!(content.turn_complete);
        assert_eq!(content.input_transcription.unwrap().text, "hello");
        assert_eq!(content.output_transcription.unwrap().text, "hi");
    }

    #[test]
    fn test_sparse_messages_parse() {
        let msg: ServerMessage = serde_json::from_str(r#"{"setupComplete": {}}"#).unwrap();
        assert!(msg.setup_complete.is_some());
        assert!(msg.server_content.is_none());

        let msg: ServerMessage = serde_json::from_str(r#"{"serverContent": {}}"#).unwrap();
        let content = msg.server_content.unwrap();
        assert!(!content.interrupted);
        assert_eq!(content.audio_data(), None);
    }
}
