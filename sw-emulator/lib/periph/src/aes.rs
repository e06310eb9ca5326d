/*++

Licensed under the Apache-2.0 license.

File Name:

    aes.rs

Abstract:

    File contains the emulated AES engine. Data moves through 32-bit
    data_in/data_out registers; the engine supports ECB, CBC, CTR, CCM,
    GCM and CMAC, the last two in phases so software can save and restore
    the running authenticator between sessions.

--*/

use aesflow_emu_crypto::{Aes as AesCipher, AesCbc, AesCcm, AesCmac, AesCtr, CmacState, GHash};
use rand::Rng;
use std::collections::VecDeque;
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::register_bitfields;
use tock_registers::registers::InMemoryRegister;

register_bitfields! [
    u32,

    /// Status Register Fields
    pub Status [
        IDLE OFFSET(0) NUMBITS(1) [],
        OUTPUT_VALID OFFSET(3) NUMBITS(1) [],
        INPUT_READY OFFSET(4) NUMBITS(1) [],
        AUTH_ERROR OFFSET(5) NUMBITS(1) [],
        FAULT OFFSET(6) NUMBITS(1) [],
    ],

    /// Control Register Fields
    pub Ctrl [
        OP OFFSET(0) NUMBITS(2) [
            ENCRYPT = 1,
            DECRYPT = 2,
        ],
        MODE OFFSET(2) NUMBITS(8) [
            ECB = 1,
            CBC = 2,
            CTR = 16,
            GCM = 32,
            CCM = 64,
            CMAC = 128,
        ],
        KEY_LEN OFFSET(10) NUMBITS(3) [
            KEY_128 = 1,
            KEY_192 = 2,
            KEY_256 = 4,
        ],
    ],

    /// Phase Control Register Fields
    pub PhaseCtrl [
        PHASE OFFSET(0) NUMBITS(6) [
            INIT = 1,
            RESTORE = 2,
            AAD = 4,
            TEXT = 8,
            SAVE = 16,
            TAG = 32,
        ],
    ],

    /// Trigger Register Fields
    pub Trigger [
        START OFFSET(0) NUMBITS(1) [],
        KEY_IV_DATA_IN_CLEAR OFFSET(1) NUMBITS(1) [],
        DATA_OUT_CLEAR OFFSET(2) NUMBITS(1) [],
    ],
];

/// AES block size
const BLOCK_SIZE: usize = 16;

/// Bytes the output FIFO holds before the engine stops taking input
const OUTPUT_FIFO_DEPTH: usize = 32;

/// Size of the CMAC state moved by the SAVE and RESTORE phases:
/// chaining value, pending block, pending flag word.
pub const CMAC_STATE_SIZE: usize = 36;

/// Size of the GCM state moved by the SAVE and RESTORE phases.
pub const GCM_STATE_SIZE: usize = 16;

/// CCM session: AAD echo, payload, tag.
struct CcmSession {
    ccm: AesCcm,
    encrypt: bool,
    aad_len: usize,
    data_len: usize,
    tag_len: usize,

    /// Input bytes consumed
    pos: usize,

    block: [u8; BLOCK_SIZE],
    block_len: usize,

    /// Computed tag, valid once the payload is complete
    tag: [u8; BLOCK_SIZE],

    /// Tag received from software when decrypting
    tag_in: [u8; BLOCK_SIZE],
}

impl CcmSession {
    fn input_len(&self) -> usize {
        self.aad_len + self.data_len + if self.encrypt { 0 } else { self.tag_len }
    }

    fn output_len(&self) -> usize {
        self.aad_len + self.data_len + if self.encrypt { self.tag_len } else { 0 }
    }

    /// Consume one input byte; returns `Some(authentic)` once decryption
    /// completes.
    fn push(&mut self, byte: u8, out: &mut VecDeque<u8>) -> Option<bool> {
        let payload_end = self.aad_len + self.data_len;
        if self.pos < self.aad_len {
            self.ccm.aad(&[byte]);
            out.push_back(byte);
            self.pos += 1;
            if self.pos == self.aad_len {
                return self.aad_done(out);
            }
        } else if self.pos < payload_end {
            self.block[self.block_len] = byte;
            self.block_len += 1;
            self.pos += 1;
            if self.block_len == BLOCK_SIZE || self.pos == payload_end {
                let data = &mut self.block[..self.block_len];
                if self.encrypt {
                    self.ccm.encrypt(data);
                } else {
                    self.ccm.decrypt(data);
                }
                out.extend(data.iter());
                self.block_len = 0;
                if self.pos == payload_end {
                    return self.payload_done(out);
                }
            }
        } else {
            self.tag_in[self.pos - payload_end] = byte;
            self.pos += 1;
            if self.pos == self.input_len() {
                return Some(self.tag_in[..self.tag_len] == self.tag[..self.tag_len]);
            }
        }
        None
    }

    /// Run the boundary steps an empty AAD (and payload) needs up front
    fn begin(&mut self, out: &mut VecDeque<u8>) -> Option<bool> {
        if self.aad_len == 0 {
            self.aad_done(out)
        } else {
            None
        }
    }

    fn aad_done(&mut self, out: &mut VecDeque<u8>) -> Option<bool> {
        self.ccm.end_aad();
        if self.data_len == 0 {
            self.payload_done(out)
        } else {
            None
        }
    }

    fn payload_done(&mut self, out: &mut VecDeque<u8>) -> Option<bool> {
        self.tag = self.ccm.tag();
        if self.encrypt {
            out.extend(self.tag[..self.tag_len].iter());
            None
        } else if self.tag_len == 0 {
            Some(true)
        } else {
            None
        }
    }
}

/// GCM session with a 96-bit nonce
struct GcmSession {
    cipher: AesCipher,
    ghash: GHash,
    encrypt: bool,
    nonce: [u8; 12],
    counter: u32,
}

impl GcmSession {
    fn counter_block(&self, counter: u32) -> [u8; BLOCK_SIZE] {
        let mut block = [0u8; BLOCK_SIZE];
        block[..12].copy_from_slice(&self.nonce);
        block[12..].copy_from_slice(&counter.to_be_bytes());
        block
    }
}

enum Session {
    None,
    Ecb { cipher: AesCipher, encrypt: bool },
    Cbc { cbc: AesCbc, encrypt: bool },
    Ctr(AesCtr),
    Ccm(Box<CcmSession>),
    Gcm(Box<GcmSession>),
    Cmac(Box<AesCmac>),
}

/// AES peripheral implementation
pub struct Aes {
    key_share0: [u32; 8],
    key_share1: [u32; 8],
    iv: [u32; 4],

    ctrl: InMemoryRegister<u32, Ctrl::Register>,
    phase_ctrl: InMemoryRegister<u32, PhaseCtrl::Register>,
    status: InMemoryRegister<u32, Status::Register>,

    /// CCM message lengths
    aad_len: u32,
    data_len: u32,
    tag_len: u32,

    /// Input byte count of the next phase
    phase_len: u32,

    session: Session,

    /// Input bytes still expected in the current phase
    in_remaining: usize,

    /// Output bytes still to be read in the current phase
    out_remaining: usize,

    /// Input staging
    buf: [u8; CMAC_STATE_SIZE],
    buf_len: usize,

    /// Input bytes that make up one processing unit in this phase
    chunk_len: usize,

    data_out: VecDeque<u8>,
}

impl Default for Aes {
    fn default() -> Self {
        Self::new()
    }
}

impl Aes {
    /// Create a new AES engine instance
    pub fn new() -> Self {
        Self {
            key_share0: [0; 8],
            key_share1: [0; 8],
            iv: [0; 4],
            ctrl: InMemoryRegister::new(0),
            phase_ctrl: InMemoryRegister::new(0),
            status: InMemoryRegister::new(Status::IDLE::SET.value),
            aad_len: 0,
            data_len: 0,
            tag_len: 0,
            phase_len: 0,
            session: Session::None,
            in_remaining: 0,
            out_remaining: 0,
            buf: [0; CMAC_STATE_SIZE],
            buf_len: 0,
            chunk_len: BLOCK_SIZE,
            data_out: VecDeque::new(),
        }
    }

    /// Return the engine to its power-on state
    pub fn warm_reset(&mut self) {
        *self = Self::new();
    }

    /// Status register value
    pub fn status(&self) -> u32 {
        self.status.get()
    }

    /// Write the control register
    pub fn write_ctrl(&mut self, val: u32) {
        self.ctrl.set(val);
    }

    /// Write a key register. The key is held as two random shares.
    pub fn write_key(&mut self, idx: usize, val: u32) {
        if idx >= self.key_share0.len() {
            self.fault();
            return;
        }
        let mask: u32 = rand::thread_rng().gen();
        self.key_share0[idx] = val ^ mask;
        self.key_share1[idx] = mask;
    }

    /// Write an IV register
    pub fn write_iv(&mut self, idx: usize, val: u32) {
        match self.iv.get_mut(idx) {
            Some(word) => *word = val,
            None => self.fault(),
        }
    }

    /// Read an IV register. Reflects the chaining value or counter after
    /// CBC, CTR and GCM traffic.
    pub fn read_iv(&self, idx: usize) -> u32 {
        self.iv.get(idx).copied().unwrap_or(0)
    }

    /// Write the CCM AAD length register
    pub fn write_aad_len(&mut self, val: u32) {
        self.aad_len = val;
    }

    /// Write the CCM payload length register
    pub fn write_data_len(&mut self, val: u32) {
        self.data_len = val;
    }

    /// Write the CCM tag length register
    pub fn write_tag_len(&mut self, val: u32) {
        self.tag_len = val;
    }

    /// Write the input byte count of the next phase
    pub fn write_phase_len(&mut self, val: u32) {
        self.phase_len = val;
    }

    /// Write the trigger register
    pub fn write_trigger(&mut self, val: u32) {
        let trigger = InMemoryRegister::<u32, Trigger::Register>::new(val);

        if trigger.is_set(Trigger::KEY_IV_DATA_IN_CLEAR) {
            rand::thread_rng().fill(&mut self.key_share0[..]);
            rand::thread_rng().fill(&mut self.key_share1[..]);
            rand::thread_rng().fill(&mut self.iv[..]);
            rand::thread_rng().fill(&mut self.buf[..]);
            self.buf_len = 0;
            self.session = Session::None;
            self.in_remaining = 0;
            self.out_remaining = 0;
            self.status.set(Status::IDLE::SET.value);
        }
        if trigger.is_set(Trigger::DATA_OUT_CLEAR) {
            self.data_out.clear();
            self.out_remaining = 0;
            self.update_status();
        }
        if trigger.is_set(Trigger::START) {
            self.start();
        }
    }

    /// Write the phase control register; starts a phase of
    /// `phase_len` input bytes.
    pub fn write_phase(&mut self, val: u32) {
        self.phase_ctrl.set(val);
        if self.in_remaining != 0 || self.out_remaining != 0 {
            self.fault();
            return;
        }

        let Some(phase) = self.phase_ctrl.read_as_enum(PhaseCtrl::PHASE) else {
            self.fault();
            return;
        };
        let len = self.phase_len as usize;
        self.buf_len = 0;
        self.chunk_len = BLOCK_SIZE;

        use PhaseCtrl::PHASE::Value as Phase;
        let out_len = match (&mut self.session, phase) {
            (Session::Ecb { .. } | Session::Cbc { .. }, Phase::TEXT) if len % BLOCK_SIZE == 0 => {
                len
            }
            (Session::Ctr(_), Phase::TEXT) => len,
            (Session::Ccm(ccm), Phase::TEXT) if len == ccm.input_len() => {
                let out_len = ccm.output_len();
                let verdict = ccm.begin(&mut self.data_out);
                self.in_remaining = len;
                self.out_remaining = out_len;
                if let Some(authentic) = verdict {
                    self.ccm_verdict(authentic);
                }
                self.update_status();
                return;
            }
            (Session::Gcm(gcm), Phase::INIT) if len == 0 => {
                gcm.ghash.restore(&[0u8; BLOCK_SIZE]);
                0
            }
            (Session::Gcm(_), Phase::RESTORE) if len == GCM_STATE_SIZE => 0,
            (Session::Gcm(_), Phase::AAD) => 0,
            (Session::Gcm(_), Phase::TEXT) => len,
            (Session::Gcm(gcm), Phase::SAVE) if len == 0 => {
                self.data_out.extend(gcm.ghash.state());
                GCM_STATE_SIZE
            }
            (Session::Gcm(_), Phase::TAG) if len == BLOCK_SIZE => BLOCK_SIZE,
            (Session::Cmac(cmac), Phase::INIT) if len == 0 => {
                cmac.restore(&CmacState::default());
                0
            }
            (Session::Cmac(_), Phase::RESTORE) if len == CMAC_STATE_SIZE => {
                self.chunk_len = CMAC_STATE_SIZE;
                0
            }
            (Session::Cmac(_), Phase::TEXT) if len % BLOCK_SIZE == 0 => 0,
            (Session::Cmac(cmac), Phase::SAVE) if len == 0 => {
                let state = cmac.state();
                self.data_out.extend(state.mac);
                self.data_out.extend(state.pending);
                self.data_out
                    .extend(u32::from(state.pending_valid).to_le_bytes());
                CMAC_STATE_SIZE
            }
            (Session::Cmac(cmac), Phase::TAG) if len == 0 => {
                self.data_out.extend(cmac.finalize(&[]));
                BLOCK_SIZE
            }
            (Session::Cmac(_), Phase::TAG) if len <= BLOCK_SIZE => BLOCK_SIZE,
            _ => {
                self.fault();
                return;
            }
        };

        self.in_remaining = len;
        self.out_remaining = out_len;
        self.update_status();
    }

    /// Write the data_in register
    pub fn write_data_in(&mut self, val: u32) {
        if !self.status.is_set(Status::INPUT_READY) {
            self.fault();
            return;
        }

        let n = self.in_remaining.min(4);
        for &byte in &val.to_le_bytes()[..n] {
            self.in_remaining -= 1;
            if let Session::Ccm(ccm) = &mut self.session {
                if let Some(authentic) = ccm.push(byte, &mut self.data_out) {
                    self.ccm_verdict(authentic);
                }
                continue;
            }
            self.buf[self.buf_len] = byte;
            self.buf_len += 1;
            if self.buf_len == self.chunk_len || self.in_remaining == 0 {
                self.process();
                self.buf_len = 0;
            }
        }
        self.update_status();
    }

    /// Read the data_out register. A short final word is zero padded.
    pub fn read_data_out(&mut self) -> u32 {
        if !self.status.is_set(Status::OUTPUT_VALID) {
            self.fault();
            return 0;
        }

        let mut word = [0u8; 4];
        for byte in word.iter_mut() {
            match self.data_out.pop_front() {
                Some(b) => {
                    *byte = b;
                    self.out_remaining -= 1;
                }
                None => break,
            }
        }
        self.update_status();
        u32::from_le_bytes(word)
    }

    fn key(&self) -> Option<Vec<u8>> {
        let len = match self.ctrl.read_as_enum(Ctrl::KEY_LEN)? {
            Ctrl::KEY_LEN::Value::KEY_128 => 16,
            Ctrl::KEY_LEN::Value::KEY_192 => 24,
            Ctrl::KEY_LEN::Value::KEY_256 => 32,
        };
        let key = self
            .key_share0
            .iter()
            .zip(self.key_share1.iter())
            .flat_map(|(s0, s1)| (s0 ^ s1).to_le_bytes())
            .take(len)
            .collect();
        Some(key)
    }

    fn iv_bytes(&self) -> [u8; BLOCK_SIZE] {
        let mut iv = [0u8; BLOCK_SIZE];
        for (chunk, word) in iv.chunks_exact_mut(4).zip(self.iv.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        iv
    }

    fn set_iv_bytes(&mut self, iv: &[u8; BLOCK_SIZE]) {
        for (word, chunk) in self.iv.iter_mut().zip(iv.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
    }

    fn is_encrypt(&self) -> Option<bool> {
        match self.ctrl.read_as_enum(Ctrl::OP)? {
            Ctrl::OP::Value::ENCRYPT => Some(true),
            Ctrl::OP::Value::DECRYPT => Some(false),
        }
    }

    fn start(&mut self) {
        match self.build_session() {
            Some(session) => {
                self.session = session;
                self.data_out.clear();
                self.buf_len = 0;
                self.in_remaining = 0;
                self.out_remaining = 0;
                self.status.set(0);
                self.update_status();
            }
            None => {
                self.session = Session::None;
                self.fault();
            }
        }
    }

    fn build_session(&self) -> Option<Session> {
        let key = self.key()?;
        let encrypt = self.is_encrypt()?;
        let cipher = AesCipher::new(&key)?;
        let iv = self.iv_bytes();

        let session = match self.ctrl.read_as_enum(Ctrl::MODE)? {
            Ctrl::MODE::Value::ECB => Session::Ecb { cipher, encrypt },
            Ctrl::MODE::Value::CBC => Session::Cbc {
                cbc: AesCbc::new(&key, &iv, encrypt)?,
                encrypt,
            },
            Ctrl::MODE::Value::CTR => Session::Ctr(AesCtr::new(&key, &iv)?),
            Ctrl::MODE::Value::CCM => {
                let tag_len = self.tag_len as usize;
                let ccm = AesCcm::new(
                    cipher,
                    &iv,
                    u64::from(self.aad_len),
                    u64::from(self.data_len),
                    tag_len,
                )?;
                Session::Ccm(Box::new(CcmSession {
                    ccm,
                    encrypt,
                    aad_len: self.aad_len as usize,
                    data_len: self.data_len as usize,
                    tag_len,
                    pos: 0,
                    block: [0; BLOCK_SIZE],
                    block_len: 0,
                    tag: [0; BLOCK_SIZE],
                    tag_in: [0; BLOCK_SIZE],
                }))
            }
            Ctrl::MODE::Value::GCM => {
                let h = cipher.encrypted(&[0u8; BLOCK_SIZE]);
                let mut nonce = [0u8; 12];
                nonce.copy_from_slice(&iv[..12]);
                Session::Gcm(Box::new(GcmSession {
                    ghash: GHash::new(&h),
                    cipher,
                    encrypt,
                    nonce,
                    counter: u32::from_be_bytes([iv[12], iv[13], iv[14], iv[15]]),
                }))
            }
            Ctrl::MODE::Value::CMAC => Session::Cmac(Box::new(AesCmac::new(cipher))),
        };
        Some(session)
    }

    /// Process the staged input unit
    fn process(&mut self) {
        let len = self.buf_len;
        let mut block = [0u8; BLOCK_SIZE];
        let n = len.min(BLOCK_SIZE);
        block[..n].copy_from_slice(&self.buf[..n]);
        let phase = self.phase_ctrl.read_as_enum(PhaseCtrl::PHASE);

        use PhaseCtrl::PHASE::Value as Phase;
        match (&mut self.session, phase) {
            (Session::Ecb { cipher, encrypt }, _) => {
                if *encrypt {
                    cipher.encrypt_block(&mut block);
                } else {
                    cipher.decrypt_block(&mut block);
                }
                self.data_out.extend(block);
            }
            (Session::Cbc { cbc, encrypt }, _) => {
                let out = cbc.crypt_block(&block);
                let chain = if *encrypt { out } else { block };
                self.data_out.extend(out);
                self.set_iv_bytes(&chain);
            }
            (Session::Ctr(ctr), _) => {
                let out = ctr.crypt_block(&block);
                self.data_out.extend(&out[..len]);
                let next = u128::from_be_bytes(self.iv_bytes()).wrapping_add(1);
                self.set_iv_bytes(&next.to_be_bytes());
            }
            (Session::Gcm(gcm), Some(Phase::RESTORE)) => gcm.ghash.restore(&block),
            (Session::Gcm(gcm), Some(Phase::AAD)) => gcm.ghash.update(&block),
            (Session::Gcm(gcm), Some(Phase::TEXT)) => {
                let stream = gcm.cipher.encrypted(&gcm.counter_block(gcm.counter));
                gcm.counter = gcm.counter.wrapping_add(1);

                let mut out = [0u8; BLOCK_SIZE];
                for i in 0..len {
                    out[i] = block[i] ^ stream[i];
                }
                let ciphertext = if gcm.encrypt { &out } else { &block };
                gcm.ghash.update(ciphertext);
                self.data_out.extend(&out[..len]);

                let counter_block = gcm.counter_block(gcm.counter);
                self.set_iv_bytes(&counter_block);
            }
            (Session::Gcm(gcm), Some(Phase::TAG)) => {
                gcm.ghash.update(&block);
                let mask = gcm.cipher.encrypted(&gcm.counter_block(1));
                self.data_out.extend(gcm.ghash.finalize(&mask));
            }
            (Session::Cmac(cmac), Some(Phase::RESTORE)) => {
                let mut state = CmacState::default();
                state.mac.copy_from_slice(&self.buf[..16]);
                state.pending.copy_from_slice(&self.buf[16..32]);
                state.pending_valid = self.buf[32..36] != [0u8; 4];
                cmac.restore(&state);
            }
            (Session::Cmac(cmac), Some(Phase::TEXT)) => cmac.update_block(&block),
            (Session::Cmac(cmac), Some(Phase::TAG)) => {
                self.data_out.extend(cmac.finalize(&block[..len]));
            }
            _ => self.fault(),
        }
    }

    fn ccm_verdict(&mut self, authentic: bool) {
        if !authentic {
            self.status.modify(Status::AUTH_ERROR::SET);
        }
    }

    fn fault(&mut self) {
        self.status.modify(Status::FAULT::SET);
        self.update_status();
    }

    fn update_status(&mut self) {
        let faulted = self.status.is_set(Status::FAULT);
        let active = !matches!(self.session, Session::None);
        let input_ready = active
            && !faulted
            && self.in_remaining > 0
            && self.data_out.len() < OUTPUT_FIFO_DEPTH;
        let output_valid = !self.data_out.is_empty()
            && (self.data_out.len() >= 4 || self.data_out.len() >= self.out_remaining);
        let idle = !active || (self.in_remaining == 0 && self.out_remaining == 0);

        self.status.modify(
            Status::INPUT_READY.val(u32::from(input_ready))
                + Status::OUTPUT_VALID.val(u32::from(output_valid))
                + Status::IDLE.val(u32::from(idle)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_key(aes: &mut Aes, key: &[u8]) {
        for (idx, chunk) in key.chunks(4).enumerate() {
            aes.write_key(idx, u32::from_le_bytes(chunk.try_into().unwrap()));
        }
    }

    fn load_iv(aes: &mut Aes, iv: &[u8; 16]) {
        for (idx, chunk) in iv.chunks(4).enumerate() {
            aes.write_iv(idx, u32::from_le_bytes(chunk.try_into().unwrap()));
        }
    }

    fn key_len(key: &[u8]) -> FieldValueU32 {
        match key.len() {
            16 => Ctrl::KEY_LEN::KEY_128,
            24 => Ctrl::KEY_LEN::KEY_192,
            _ => Ctrl::KEY_LEN::KEY_256,
        }
    }

    type FieldValueU32 = tock_registers::fields::FieldValue<u32, Ctrl::Register>;

    /// Push `input` through a phase and collect `out_len` output bytes
    fn run_phase(aes: &mut Aes, phase: u32, input: &[u8], out_len: usize) -> Vec<u8> {
        aes.write_phase_len(input.len() as u32);
        aes.write_phase(phase);

        let mut words = input.chunks(4).map(|c| {
            let mut w = [0u8; 4];
            w[..c.len()].copy_from_slice(c);
            u32::from_le_bytes(w)
        });
        let mut out = Vec::new();
        let mut pending = words.next();
        while out.len() < out_len || pending.is_some() {
            let status = aes.status();
            assert!(!Status::FAULT.is_set(status));
            if Status::OUTPUT_VALID.is_set(status) {
                out.extend(aes.read_data_out().to_le_bytes());
            } else if let Some(word) = pending {
                assert!(Status::INPUT_READY.is_set(status));
                aes.write_data_in(word);
                pending = words.next();
            } else {
                panic!("engine stalled");
            }
        }
        out.truncate(out_len);
        out
    }

    fn block(s: &str) -> [u8; 16] {
        hex::decode(s).unwrap().try_into().unwrap()
    }

    #[test]
    fn test_cbc_encrypt_updates_iv() {
        let key = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let mut aes = Aes::new();
        load_key(&mut aes, &key);
        load_iv(&mut aes, &block("000102030405060708090a0b0c0d0e0f"));
        aes.write_ctrl((Ctrl::OP::ENCRYPT + Ctrl::MODE::CBC + key_len(&key)).value);
        aes.write_trigger(Trigger::START::SET.value);

        let pt = hex::decode("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51")
            .unwrap();
        let ct = run_phase(&mut aes, PhaseCtrl::PHASE::TEXT.value, &pt, 32);
        assert_eq!(
            hex::encode(&ct),
            "7649abac8119b246cee98e9b12e9197d5086cb9b507219ee95db113a917678b2"
        );
        assert_eq!(aes.read_iv(0).to_le_bytes(), [0x50, 0x86, 0xcb, 0x9b]);
    }

    #[test]
    fn test_ecb_rejects_partial_block() {
        let mut aes = Aes::new();
        load_key(&mut aes, &[0u8; 16]);
        aes.write_ctrl((Ctrl::OP::ENCRYPT + Ctrl::MODE::ECB + Ctrl::KEY_LEN::KEY_128).value);
        aes.write_trigger(Trigger::START::SET.value);
        aes.write_phase_len(15);
        aes.write_phase(PhaseCtrl::PHASE::TEXT.value);
        assert!(Status::FAULT.is_set(aes.status()));
    }

    #[test]
    fn test_ctr_partial_block_advances_counter() {
        let key = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let mut aes = Aes::new();
        load_key(&mut aes, &key);
        load_iv(&mut aes, &block("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff"));
        aes.write_ctrl((Ctrl::OP::ENCRYPT + Ctrl::MODE::CTR + key_len(&key)).value);
        aes.write_trigger(Trigger::START::SET.value);

        let pt = hex::decode("6bc1bee22e409f96e93d7e117393172aae2d8a").unwrap();
        let ct = run_phase(&mut aes, PhaseCtrl::PHASE::TEXT.value, &pt, pt.len());
        assert_eq!(hex::encode(&ct), "874d6191b620e3261bef6864990db6ce9806f6");
        assert_eq!(aes.read_iv(3).to_le_bytes(), [0xfc, 0xfd, 0xff, 0x01]);
    }

    #[test]
    fn test_ccm_rfc3610_packet_1() {
        let key = hex::decode("c0c1c2c3c4c5c6c7c8c9cacbcccdcecf").unwrap();
        let nonce = hex::decode("00000003020100a0a1a2a3a4a5").unwrap();
        let aad = hex::decode("0001020304050607").unwrap();
        let pt = hex::decode("08090a0b0c0d0e0f101112131415161718191a1b1c1d1e").unwrap();
        let mut a0 = [0u8; 16];
        a0[0] = 1;
        a0[1..14].copy_from_slice(&nonce);

        let mut aes = Aes::new();
        load_key(&mut aes, &key);
        load_iv(&mut aes, &a0);
        aes.write_aad_len(aad.len() as u32);
        aes.write_data_len(pt.len() as u32);
        aes.write_tag_len(8);
        aes.write_ctrl((Ctrl::OP::ENCRYPT + Ctrl::MODE::CCM + key_len(&key)).value);
        aes.write_trigger(Trigger::START::SET.value);

        let input = [aad.clone(), pt.clone()].concat();
        let out = run_phase(&mut aes, PhaseCtrl::PHASE::TEXT.value, &input, 8 + 23 + 8);
        assert_eq!(&out[..8], &aad[..]);
        assert_eq!(
            hex::encode(&out[8..]),
            "588c979a61c663d2f066d0c2c0f989806d5f6b61dac38417e8d12cfdf926e0"
        );

        // Decrypt with a corrupted tag
        let mut aes = Aes::new();
        load_key(&mut aes, &key);
        load_iv(&mut aes, &a0);
        aes.write_aad_len(aad.len() as u32);
        aes.write_data_len(pt.len() as u32);
        aes.write_tag_len(8);
        aes.write_ctrl((Ctrl::OP::DECRYPT + Ctrl::MODE::CCM + key_len(&key)).value);
        aes.write_trigger(Trigger::START::SET.value);

        let mut input = [aad.clone(), out[8..].to_vec()].concat();
        let last = input.len() - 1;
        input[last] ^= 1;
        let plain = run_phase(&mut aes, PhaseCtrl::PHASE::TEXT.value, &input, 8 + 23);
        assert_eq!(&plain[8..], &pt[..]);
        assert!(Status::AUTH_ERROR.is_set(aes.status()));
    }

    #[test]
    fn test_gcm_save_restore_matches_single_session() {
        use aes_gcm::aead::{AeadInPlace, KeyInit};

        let key = [0x42u8; 32];
        let nonce = [0x24u8; 12];
        let aad = [0x11u8; 32];
        let pt = [0x22u8; 40];

        let mut iv = [0u8; 16];
        iv[..12].copy_from_slice(&nonce);
        iv[15] = 2;

        let ctrl = (Ctrl::OP::ENCRYPT + Ctrl::MODE::GCM + Ctrl::KEY_LEN::KEY_256).value;

        // First session: AAD, then save
        let mut aes = Aes::new();
        load_key(&mut aes, &key);
        load_iv(&mut aes, &iv);
        aes.write_ctrl(ctrl);
        aes.write_trigger(Trigger::START::SET.value);
        run_phase(&mut aes, PhaseCtrl::PHASE::INIT.value, &[], 0);
        run_phase(&mut aes, PhaseCtrl::PHASE::AAD.value, &aad, 0);
        let mut ct = run_phase(&mut aes, PhaseCtrl::PHASE::TEXT.value, &pt[..32], 32);
        let saved = run_phase(&mut aes, PhaseCtrl::PHASE::SAVE.value, &[], 16);
        let mut next_iv = [0u8; 16];
        for (idx, chunk) in next_iv.chunks_mut(4).enumerate() {
            chunk.copy_from_slice(&aes.read_iv(idx).to_le_bytes());
        }
        aes.write_trigger((Trigger::KEY_IV_DATA_IN_CLEAR::SET + Trigger::DATA_OUT_CLEAR::SET).value);

        // Second session: restore, tail, tag
        load_key(&mut aes, &key);
        load_iv(&mut aes, &next_iv);
        aes.write_ctrl(ctrl);
        aes.write_trigger(Trigger::START::SET.value);
        run_phase(&mut aes, PhaseCtrl::PHASE::RESTORE.value, &saved, 0);
        ct.extend(run_phase(&mut aes, PhaseCtrl::PHASE::TEXT.value, &pt[32..], 8));
        let mut lengths = [0u8; 16];
        lengths[..8].copy_from_slice(&(aad.len() as u64 * 8).to_be_bytes());
        lengths[8..].copy_from_slice(&(pt.len() as u64 * 8).to_be_bytes());
        let tag = run_phase(&mut aes, PhaseCtrl::PHASE::TAG.value, &lengths, 16);

        let gcm = aes_gcm::Aes256Gcm::new_from_slice(&key).unwrap();
        let mut expected = pt.to_vec();
        let expected_tag = gcm
            .encrypt_in_place_detached((&nonce).into(), &aad, &mut expected)
            .unwrap();
        assert_eq!(ct, expected);
        assert_eq!(&tag[..], expected_tag.as_slice());
    }

    #[test]
    fn test_cmac_rfc4493_with_save_restore() {
        let key = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let msg = hex::decode(
            "6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e5130c81c46a35ce411",
        )
        .unwrap();
        let ctrl = (Ctrl::OP::ENCRYPT + Ctrl::MODE::CMAC + Ctrl::KEY_LEN::KEY_128).value;

        let mut aes = Aes::new();
        load_key(&mut aes, &key);
        aes.write_ctrl(ctrl);
        aes.write_trigger(Trigger::START::SET.value);
        run_phase(&mut aes, PhaseCtrl::PHASE::INIT.value, &[], 0);
        run_phase(&mut aes, PhaseCtrl::PHASE::TEXT.value, &msg[..32], 0);
        let saved = run_phase(&mut aes, PhaseCtrl::PHASE::SAVE.value, &[], CMAC_STATE_SIZE);

        let mut aes = Aes::new();
        load_key(&mut aes, &key);
        aes.write_ctrl(ctrl);
        aes.write_trigger(Trigger::START::SET.value);
        run_phase(&mut aes, PhaseCtrl::PHASE::RESTORE.value, &saved, 0);
        let tag = run_phase(&mut aes, PhaseCtrl::PHASE::TAG.value, &msg[32..], 16);
        assert_eq!(hex::encode(tag), "dfa66747de9ae63030ca32611497c827");
    }

    #[test]
    fn test_invalid_key_length_faults() {
        let mut aes = Aes::new();
        aes.write_ctrl(Ctrl::OP::ENCRYPT.value | Ctrl::MODE::ECB.value);
        aes.write_trigger(Trigger::START::SET.value);
        assert!(Status::FAULT.is_set(aes.status()));
    }

    #[test]
    fn test_write_without_phase_faults() {
        let mut aes = Aes::new();
        load_key(&mut aes, &[0u8; 16]);
        aes.write_ctrl((Ctrl::OP::ENCRYPT + Ctrl::MODE::ECB + Ctrl::KEY_LEN::KEY_128).value);
        aes.write_trigger(Trigger::START::SET.value);
        aes.write_data_in(0);
        assert!(Status::FAULT.is_set(aes.status()));
    }

    #[test]
    fn test_clear_returns_to_idle() {
        let mut aes = Aes::new();
        load_key(&mut aes, &[0u8; 16]);
        aes.write_ctrl((Ctrl::OP::ENCRYPT + Ctrl::MODE::ECB + Ctrl::KEY_LEN::KEY_128).value);
        aes.write_trigger(Trigger::START::SET.value);
        aes.write_trigger((Trigger::KEY_IV_DATA_IN_CLEAR::SET + Trigger::DATA_OUT_CLEAR::SET).value);
        assert!(Status::IDLE.is_set(aes.status()));
        assert!(!Status::INPUT_READY.is_set(aes.status()));
    }
}
