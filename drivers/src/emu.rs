/*++

Licensed under the Apache-2.0 license.

File Name:

    emu.rs

Abstract:

    File contains the engine traits implemented on the emulated AES and
    SHA-256 peripherals.

--*/

use crate::engine::{
    AesEngine, AesMode, AesOperation, EngineConfig, EnginePhase, EngineStatus, HashEngine,
    HashMode, HashStatus,
};
use aesflow_emu_periph::{AesCtrl, AesPhaseCtrl, AesTrigger, HashSha256, Sha256Control};

pub use aesflow_emu_periph::Aes as EmuAes;

impl AesEngine for EmuAes {
    fn reset(&mut self) {
        self.write_trigger(
            (AesTrigger::KEY_IV_DATA_IN_CLEAR::SET + AesTrigger::DATA_OUT_CLEAR::SET).value,
        );
    }

    fn start(&mut self, config: &EngineConfig) {
        let op = match config.op {
            AesOperation::Encrypt => AesCtrl::OP::ENCRYPT,
            AesOperation::Decrypt => AesCtrl::OP::DECRYPT,
        };
        let mode = match config.mode {
            AesMode::Ecb => AesCtrl::MODE::ECB,
            AesMode::Cbc => AesCtrl::MODE::CBC,
            AesMode::Ctr => AesCtrl::MODE::CTR,
            AesMode::Ccm => AesCtrl::MODE::CCM,
            AesMode::Gcm => AesCtrl::MODE::GCM,
            AesMode::Cmac => AesCtrl::MODE::CMAC,
        };
        let key_len = match config.key.len() {
            16 => AesCtrl::KEY_LEN::KEY_128,
            24 => AesCtrl::KEY_LEN::KEY_192,
            _ => AesCtrl::KEY_LEN::KEY_256,
        };
        self.write_ctrl((op + mode + key_len).value);

        for (idx, chunk) in config.key.chunks(4).enumerate() {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            self.write_key(idx, u32::from_le_bytes(word));
        }
        for (idx, chunk) in config.iv.chunks_exact(4).enumerate() {
            self.write_iv(idx, u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
        self.write_aad_len(config.aad_len);
        self.write_data_len(config.data_len);
        self.write_tag_len(config.tag_len);

        self.write_trigger(AesTrigger::START::SET.value);
    }

    fn set_phase(&mut self, phase: EnginePhase, len: u32) {
        let phase = match phase {
            EnginePhase::Init => AesPhaseCtrl::PHASE::INIT,
            EnginePhase::Restore => AesPhaseCtrl::PHASE::RESTORE,
            EnginePhase::Aad => AesPhaseCtrl::PHASE::AAD,
            EnginePhase::Text => AesPhaseCtrl::PHASE::TEXT,
            EnginePhase::Save => AesPhaseCtrl::PHASE::SAVE,
            EnginePhase::Tag => AesPhaseCtrl::PHASE::TAG,
        };
        self.write_phase_len(len);
        self.write_phase(phase.value);
    }

    fn status(&self) -> EngineStatus {
        EngineStatus::from_bits_truncate(EmuAes::status(self))
    }

    fn write_word(&mut self, word: u32) {
        self.write_data_in(word);
    }

    fn read_word(&mut self) -> u32 {
        self.read_data_out()
    }

    fn iv(&self) -> [u8; 16] {
        let mut iv = [0u8; 16];
        for (idx, chunk) in iv.chunks_exact_mut(4).enumerate() {
            chunk.copy_from_slice(&self.read_iv(idx).to_le_bytes());
        }
        iv
    }

    fn stop(&mut self) {
        AesEngine::reset(self);
    }
}

/// Emulated SHA-256 engine.
///
/// Tracks the block word index so the sixteenth word triggers the
/// compression, loading a saved chaining value first when resuming.
pub struct EmuSha256 {
    periph: HashSha256,
    mode: HashMode,
    resume: Option<[u32; 8]>,
    word_idx: usize,
}

impl Default for EmuSha256 {
    fn default() -> Self {
        Self::new()
    }
}

impl EmuSha256 {
    pub fn new() -> Self {
        Self {
            periph: HashSha256::new(),
            mode: HashMode::Sha256,
            resume: None,
            word_idx: 0,
        }
    }

    pub fn periph(&self) -> &HashSha256 {
        &self.periph
    }

    fn compress(&mut self) {
        let mode = match self.mode {
            HashMode::Sha224 => Sha256Control::MODE::SHA256_224,
            HashMode::Sha256 => Sha256Control::MODE::SHA256,
        };
        let control = match self.resume.take() {
            Some(state) => {
                for (idx, word) in state.iter().enumerate() {
                    self.periph.write_digest(idx, *word);
                }
                Sha256Control::NEXT::SET + mode
            }
            None => Sha256Control::INIT::SET + mode,
        };
        self.periph.write_control(control.value);
    }
}

impl HashEngine for EmuSha256 {
    fn reset(&mut self) {
        self.periph.write_control(Sha256Control::ZEROIZE::SET.value);
        self.resume = None;
        self.word_idx = 0;
    }

    fn start(&mut self, mode: HashMode, state: Option<&[u32; 8]>) {
        self.mode = mode;
        self.resume = state.copied();
        self.word_idx = 0;
    }

    fn status(&self) -> HashStatus {
        HashStatus::from_bits_truncate(self.periph.status())
    }

    fn write_word(&mut self, word: u32) {
        self.periph.write_block(self.word_idx, word);
        self.word_idx += 1;
        if self.word_idx == 16 {
            self.word_idx = 0;
            self.compress();
        }
    }

    fn state(&self) -> [u32; 8] {
        core::array::from_fn(|idx| self.periph.read_digest(idx))
    }
}
