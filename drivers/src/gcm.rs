/*++

Licensed under the Apache-2.0 license.

File Name:

    gcm.rs

Abstract:

    File contains the multipart AES-GCM operation.

    With a 96-bit nonce every call runs one engine session that restores
    the GHASH state, processes whole blocks, and saves the state again.
    Other nonce lengths are handled in software: GHASH with 4-bit tables
    and the counter mode cursor.

--*/

use crate::aes::{Aes, EngineSession, AES_BLOCK_SIZE_BYTES};
use crate::ctr::{ctr_crypt, AesCtrCursor};
use crate::engine::{AesEngine, AesMode, AesOperation, EngineConfig, EngineLock, EnginePhase};
use crate::ghash::Ghash;
use crate::key::{KeyBuf, KeyMaterial};
use crate::word_channel::Sink;
use crate::{cprintln, AesflowError, AesflowResult};
use subtle::ConstantTimeEq;

/// Nonce length the engine takes
pub const GCM_ENGINE_NONCE_SIZE: usize = 12;
pub const GCM_MIN_TAG_SIZE: usize = 4;
pub const GCM_MAX_TAG_SIZE: usize = 16;

/// First counter used for payload; counter 1 masks the tag
const GCM_FIRST_COUNTER: u32 = 2;

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
enum GcmState {
    #[default]
    Inactive,
    New,
    NonceSet,
    Aad,
    Payload,
}

/// Engine path state carried between sessions
#[derive(Clone, Default)]
struct EnginePath {
    nonce: [u8; GCM_ENGINE_NONCE_SIZE],
    counter: u32,
    ghash: [u8; AES_BLOCK_SIZE_BYTES],
    saved: bool,
}

/// Software path state
#[derive(Clone, Default)]
struct SoftwarePath {
    ghash: Ghash,
    cursor: AesCtrCursor,
    tag_mask: [u8; AES_BLOCK_SIZE_BYTES],
}

#[derive(Clone, Default)]
enum GcmPath {
    #[default]
    Unset,
    Engine(EnginePath),
    Software(SoftwarePath),
}

/// `len(A) || len(C)` in bits
fn length_block(aad_len: u64, payload_len: u64) -> [u8; AES_BLOCK_SIZE_BYTES] {
    let mut block = [0u8; AES_BLOCK_SIZE_BYTES];
    block[..8].copy_from_slice(&(aad_len << 3).to_be_bytes());
    block[8..].copy_from_slice(&(payload_len << 3).to_be_bytes());
    block
}

/// Multipart AES-GCM
#[derive(Clone, Default)]
pub struct AesGcmOperation {
    state: GcmState,
    op: Option<AesOperation>,
    key: KeyBuf,
    tag_len: usize,

    /// Use the software path for every nonce length
    force_software: bool,

    path: GcmPath,

    /// Engine path partial block, AAD before the payload starts
    staging: [u8; AES_BLOCK_SIZE_BYTES],
    staging_len: usize,

    lengths: Option<(u64, u64)>,
    aad_len: u64,
    payload_len: u64,
}

impl AesGcmOperation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operation that computes GHASH in software even for 96-bit nonces
    pub fn with_software_ghash() -> Self {
        Self {
            force_software: true,
            ..Self::default()
        }
    }

    pub fn encrypt_setup(&mut self, key: &KeyMaterial, tag_len: usize) -> AesflowResult<()> {
        self.setup(key, tag_len, AesOperation::Encrypt)
    }

    pub fn decrypt_setup(&mut self, key: &KeyMaterial, tag_len: usize) -> AesflowResult<()> {
        self.setup(key, tag_len, AesOperation::Decrypt)
    }

    fn setup(&mut self, key: &KeyMaterial, tag_len: usize, op: AesOperation) -> AesflowResult<()> {
        if self.state != GcmState::Inactive {
            Err(AesflowError::DRIVER_GCM_INVALID_STATE)?;
        }
        if !(GCM_MIN_TAG_SIZE..=GCM_MAX_TAG_SIZE).contains(&tag_len) {
            Err(AesflowError::DRIVER_GCM_INVALID_TAG_SIZE)?;
        }
        *self = Self {
            state: GcmState::New,
            op: Some(op),
            key: KeyBuf::from_aes(key)?,
            tag_len,
            force_software: self.force_software,
            ..Self::default()
        };
        Ok(())
    }

    /// Set the nonce. A 96-bit nonce takes the engine path unless the
    /// operation was created with [`AesGcmOperation::with_software_ghash`].
    pub fn set_nonce<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        nonce: &[u8],
    ) -> AesflowResult<()> {
        if self.state != GcmState::New {
            Err(AesflowError::DRIVER_GCM_INVALID_STATE)?;
        }
        if nonce.is_empty() {
            Err(AesflowError::DRIVER_GCM_INVALID_NONCE_SIZE)?;
        }

        if nonce.len() == GCM_ENGINE_NONCE_SIZE && !self.force_software {
            let mut path = EnginePath {
                counter: GCM_FIRST_COUNTER,
                ..EnginePath::default()
            };
            path.nonce.copy_from_slice(nonce);
            self.path = GcmPath::Engine(path);
        } else {
            let path = self.run(|op| op.software_path(aes, nonce))?;
            self.path = GcmPath::Software(path);
        }
        self.state = GcmState::NonceSet;
        Ok(())
    }

    fn software_path<E: AesEngine, L: EngineLock>(
        &self,
        aes: &mut Aes<E, L>,
        nonce: &[u8],
    ) -> AesflowResult<SoftwarePath> {
        let key = self.key.as_bytes();
        let h = aes.ecb_encrypt_block(key, &[0; AES_BLOCK_SIZE_BYTES])?;

        let mut j0 = [0u8; AES_BLOCK_SIZE_BYTES];
        if nonce.len() == GCM_ENGINE_NONCE_SIZE {
            j0[..GCM_ENGINE_NONCE_SIZE].copy_from_slice(nonce);
            j0[AES_BLOCK_SIZE_BYTES - 1] = 1;
        } else {
            let mut ghash = Ghash::new(&h);
            ghash.update(nonce);
            ghash.pad();
            ghash.update(&length_block(0, nonce.len() as u64));
            j0 = ghash.digest();
        }

        let tag_mask = aes.ecb_encrypt_block(key, &j0)?;
        let mut counter = [0u8; 4];
        counter.copy_from_slice(&j0[12..]);
        j0[12..].copy_from_slice(&u32::from_be_bytes(counter).wrapping_add(1).to_be_bytes());

        Ok(SoftwarePath {
            ghash: Ghash::new(&h),
            cursor: AesCtrCursor::new_inc32(j0),
            tag_mask,
        })
    }

    /// Declare the total AAD and payload lengths; checked at finish
    pub fn set_lengths(&mut self, aad_len: u64, payload_len: u64) -> AesflowResult<()> {
        if !matches!(self.state, GcmState::New | GcmState::NonceSet) || self.lengths.is_some() {
            Err(AesflowError::DRIVER_GCM_INVALID_STATE)?;
        }
        self.lengths = Some((aad_len, payload_len));
        Ok(())
    }

    fn check_declared(&self, aad_len: u64, payload_len: u64) -> AesflowResult<()> {
        if let Some((max_aad, max_payload)) = self.lengths {
            if aad_len > max_aad || payload_len > max_payload {
                Err(AesflowError::DRIVER_GCM_INVALID_DATA_LENGTH)?;
            }
        }
        Ok(())
    }

    /// Absorb associated data
    pub fn update_ad<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        aad: &[u8],
    ) -> AesflowResult<()> {
        if !matches!(self.state, GcmState::NonceSet | GcmState::Aad) {
            Err(AesflowError::DRIVER_GCM_INVALID_STATE)?;
        }
        let aad_len = self.aad_len + aad.len() as u64;
        self.check_declared(aad_len, self.payload_len)?;

        self.run(|op| {
            if let GcmPath::Software(path) = &mut op.path {
                path.ghash.update(aad);
                return Ok(());
            }
            op.engine_update(aes, aad, &mut [])
        })?;
        self.aad_len = aad_len;
        self.state = GcmState::Aad;
        Ok(())
    }

    /// Bytes [`AesGcmOperation::update`] writes for `input_len` input bytes.
    ///
    /// The engine path releases output a block at a time and keeps the
    /// tail until the next call or finish.
    pub fn update_output_size(&self, input_len: usize) -> usize {
        match self.path {
            GcmPath::Engine(_) => {
                let staged = if self.state == GcmState::Payload {
                    self.staging_len
                } else {
                    0
                };
                let available = staged + input_len;
                available - available % AES_BLOCK_SIZE_BYTES
            }
            _ => input_len,
        }
    }

    /// Bytes [`AesGcmOperation::finish`] or [`AesGcmOperation::verify`]
    /// write besides the tag
    pub fn finish_output_size(&self) -> usize {
        match (&self.path, self.state) {
            (GcmPath::Engine(_), GcmState::Payload) => self.staging_len,
            _ => 0,
        }
    }

    /// Encrypt or decrypt the next payload chunk. Returns the number of
    /// bytes written.
    pub fn update<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        input: &[u8],
        output: &mut [u8],
    ) -> AesflowResult<usize> {
        if !matches!(
            self.state,
            GcmState::NonceSet | GcmState::Aad | GcmState::Payload
        ) {
            Err(AesflowError::DRIVER_GCM_INVALID_STATE)?;
        }
        let payload_len = self.payload_len + input.len() as u64;
        self.check_declared(self.aad_len, payload_len)?;
        let out_len = self.update_output_size(input.len());
        let output = output
            .get_mut(..out_len)
            .ok_or(AesflowError::DRIVER_GCM_BUFFER_TOO_SMALL)?;

        let encrypt = self.op == Some(AesOperation::Encrypt);
        self.run(|op| {
            let first = op.state != GcmState::Payload;
            if let GcmPath::Software(path) = &mut op.path {
                let key = op.key.as_bytes();
                if first {
                    path.ghash.pad();
                }
                if encrypt {
                    ctr_crypt(aes, key, &mut path.cursor, input, output)?;
                    path.ghash.update(output);
                } else {
                    path.ghash.update(input);
                    ctr_crypt(aes, key, &mut path.cursor, input, output)?;
                }
                return Ok(());
            }
            if first {
                op.flush_aad(aes)?;
            }
            op.engine_update(aes, input, output)
        })?;
        self.payload_len = payload_len;
        self.state = GcmState::Payload;
        Ok(out_len)
    }

    /// Finish encryption. Writes the held back ciphertext to `output` and
    /// the tag to `tag`; returns both lengths.
    pub fn finish<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        output: &mut [u8],
        tag: &mut [u8],
    ) -> AesflowResult<(usize, usize)> {
        if self.op != Some(AesOperation::Encrypt) {
            Err(AesflowError::DRIVER_GCM_INVALID_STATE)?;
        }
        let tag = tag
            .get_mut(..self.tag_len)
            .ok_or(AesflowError::DRIVER_GCM_BUFFER_TOO_SMALL)?;
        let out_len = self.finish_output_size();
        let output = output
            .get_mut(..out_len)
            .ok_or(AesflowError::DRIVER_GCM_BUFFER_TOO_SMALL)?;

        let computed = self.compute_tag(aes, output)?;
        tag.copy_from_slice(&computed[..tag.len()]);
        Ok((out_len, tag.len()))
    }

    /// Finish decryption and check `tag` in constant time. Writes the held
    /// back plaintext to `output`; returns its length.
    pub fn verify<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        output: &mut [u8],
        tag: &[u8],
    ) -> AesflowResult<usize> {
        if self.op != Some(AesOperation::Decrypt) {
            Err(AesflowError::DRIVER_GCM_INVALID_STATE)?;
        }
        let out_len = self.finish_output_size();
        let output = output
            .get_mut(..out_len)
            .ok_or(AesflowError::DRIVER_GCM_BUFFER_TOO_SMALL)?;

        let tag_len = self.tag_len;
        let computed = self.compute_tag(aes, output)?;
        if tag.len() != tag_len || !bool::from(computed[..tag_len].ct_eq(tag)) {
            cprintln!("[gcm] Tag mismatch");
            Err(AesflowError::DRIVER_GCM_AUTH_FAILED)?;
        }
        Ok(out_len)
    }

    /// Drop all state and wipe the key copy
    pub fn abort(&mut self) {
        *self = Self {
            force_software: self.force_software,
            ..Self::default()
        };
    }

    fn compute_tag<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        output: &mut [u8],
    ) -> AesflowResult<[u8; AES_BLOCK_SIZE_BYTES]> {
        if !matches!(
            self.state,
            GcmState::NonceSet | GcmState::Aad | GcmState::Payload
        ) {
            Err(AesflowError::DRIVER_GCM_INVALID_STATE)?;
        }
        if let Some(lengths) = self.lengths {
            if lengths != (self.aad_len, self.payload_len) {
                self.abort();
                Err(AesflowError::DRIVER_GCM_INVALID_DATA_LENGTH)?;
            }
        }

        let len_block = length_block(self.aad_len, self.payload_len);
        let result = match &mut self.path {
            GcmPath::Software(path) => {
                path.ghash.pad();
                path.ghash.update(&len_block);
                let mut tag = path.ghash.digest();
                for (t, m) in tag.iter_mut().zip(path.tag_mask.iter()) {
                    *t ^= m;
                }
                Ok(tag)
            }
            GcmPath::Engine(_) => self.engine_finish(aes, output, &len_block),
            GcmPath::Unset => Err(AesflowError::DRIVER_GCM_INVALID_STATE),
        };
        self.abort();
        result
    }

    fn engine_config(&self) -> AesflowResult<EngineConfig<'_>> {
        let GcmPath::Engine(path) = &self.path else {
            return Err(AesflowError::DRIVER_GCM_INVALID_STATE);
        };
        let mut iv = [0u8; AES_BLOCK_SIZE_BYTES];
        iv[..GCM_ENGINE_NONCE_SIZE].copy_from_slice(&path.nonce);
        iv[GCM_ENGINE_NONCE_SIZE..].copy_from_slice(&path.counter.to_be_bytes());
        Ok(EngineConfig::new(
            AesMode::Gcm,
            self.op.unwrap_or(AesOperation::Encrypt),
            self.key.as_bytes(),
            iv,
        ))
    }

    /// Load the GHASH state saved by the previous session
    fn resume<E: AesEngine>(
        session: &mut EngineSession<'_, E>,
        path: &EnginePath,
    ) -> AesflowResult<()> {
        if path.saved {
            session.transfer(EnginePhase::Restore, &[&path.ghash[..]], &mut [])
        } else {
            session.transfer(EnginePhase::Init, &[], &mut [])
        }
    }

    /// Stage `input` and run the whole blocks through the engine in the
    /// current phase: AAD before the payload, text after.
    fn engine_update<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        input: &[u8],
        output: &mut [u8],
    ) -> AesflowResult<()> {
        let available = self.staging_len + input.len();
        let take = available - available % AES_BLOCK_SIZE_BYTES;
        if take == 0 {
            self.staging[self.staging_len..available].copy_from_slice(input);
            self.staging_len = available;
            return Ok(());
        }

        let phase = if output.is_empty() {
            EnginePhase::Aad
        } else {
            EnginePhase::Text
        };
        let (head, rest) = input.split_at(take - self.staging_len);
        let config = self.engine_config()?;
        let GcmPath::Engine(path) = &self.path else {
            return Err(AesflowError::DRIVER_GCM_INVALID_STATE);
        };
        let staged = &self.staging[..self.staging_len];

        let mut ghash = [0u8; AES_BLOCK_SIZE_BYTES];
        let iv = aes.with_engine(&config, |session| {
            Self::resume(session, path)?;
            match phase {
                EnginePhase::Text => {
                    session.transfer(phase, &[staged, head], &mut [Sink::Buffer(output)])?
                }
                _ => session.transfer(phase, &[staged, head], &mut [])?,
            }
            session.transfer(EnginePhase::Save, &[], &mut [Sink::Buffer(&mut ghash)])?;
            Ok(session.iv())
        })?;

        self.save(&ghash, &iv);
        self.staging[..rest.len()].copy_from_slice(rest);
        self.staging_len = rest.len();
        Ok(())
    }

    /// Send a partial AAD block before the first payload byte
    fn flush_aad<E: AesEngine, L: EngineLock>(&mut self, aes: &mut Aes<E, L>) -> AesflowResult<()> {
        if self.staging_len == 0 {
            return Ok(());
        }
        let config = self.engine_config()?;
        let GcmPath::Engine(path) = &self.path else {
            return Err(AesflowError::DRIVER_GCM_INVALID_STATE);
        };
        let staged = &self.staging[..self.staging_len];

        let mut ghash = [0u8; AES_BLOCK_SIZE_BYTES];
        let iv = aes.with_engine(&config, |session| {
            Self::resume(session, path)?;
            session.transfer(EnginePhase::Aad, &[staged], &mut [])?;
            session.transfer(EnginePhase::Save, &[], &mut [Sink::Buffer(&mut ghash)])?;
            Ok(session.iv())
        })?;

        self.save(&ghash, &iv);
        self.staging_len = 0;
        Ok(())
    }

    /// Send the staged tail and the length block, read the tag
    fn engine_finish<E: AesEngine, L: EngineLock>(
        &self,
        aes: &mut Aes<E, L>,
        output: &mut [u8],
        len_block: &[u8; AES_BLOCK_SIZE_BYTES],
    ) -> AesflowResult<[u8; AES_BLOCK_SIZE_BYTES]> {
        let config = self.engine_config()?;
        let GcmPath::Engine(path) = &self.path else {
            return Err(AesflowError::DRIVER_GCM_INVALID_STATE);
        };
        let staged = &self.staging[..self.staging_len];
        let phase = if self.state == GcmState::Payload {
            EnginePhase::Text
        } else {
            EnginePhase::Aad
        };

        let mut tag = [0u8; AES_BLOCK_SIZE_BYTES];
        aes.with_engine(&config, |session| {
            Self::resume(session, path)?;
            if !staged.is_empty() {
                match phase {
                    EnginePhase::Text => {
                        session.transfer(phase, &[staged], &mut [Sink::Buffer(output)])?
                    }
                    _ => session.transfer(phase, &[staged], &mut [])?,
                }
            }
            session.transfer(
                EnginePhase::Tag,
                &[&len_block[..]],
                &mut [Sink::Buffer(&mut tag)],
            )
        })?;
        Ok(tag)
    }

    fn save(&mut self, ghash: &[u8; AES_BLOCK_SIZE_BYTES], iv: &[u8; AES_BLOCK_SIZE_BYTES]) {
        if let GcmPath::Engine(path) = &mut self.path {
            path.ghash = *ghash;
            path.saved = true;
            let mut counter = [0u8; 4];
            counter.copy_from_slice(&iv[GCM_ENGINE_NONCE_SIZE..]);
            path.counter = u32::from_be_bytes(counter);
        }
    }

    /// Run `f` and abort the operation if it fails
    fn run<T>(&mut self, f: impl FnOnce(&mut Self) -> AesflowResult<T>) -> AesflowResult<T> {
        let result = f(self);
        if result.is_err() {
            self.abort();
        }
        result
    }
}

/// Output produced by a one-shot GCM encryption besides the tag
pub fn gcm_encrypt_output_size(plaintext_len: usize) -> usize {
    plaintext_len
}
