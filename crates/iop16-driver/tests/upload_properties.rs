//! Property tests for upload, readback and the mismatch encoding

use iop16_driver::chip::regs::diagnostic;
use iop16_driver::chip::{Register, RegisterMap, Revision};
use iop16_driver::loading::{upload, verify};
use iop16_driver::{
    Controller, DeviceBehavior, HandshakeMode, HarnessConfig, Iop16Regs, RomImage, SimulatedIop16,
};
use proptest::prelude::*;

const ROM_WORDS: usize = 128;

fn handle() -> Iop16Regs<SimulatedIop16> {
    let map = RegisterMap::compact(Revision::Systest, ROM_WORDS);
    let sim = SimulatedIop16::new(map).with_behavior(DeviceBehavior::SignalDone {
        after_polls: 0,
        status: 0xab,
    });
    Iop16Regs::new(sim, map).expect("simulator covers its own map")
}

proptest! {
    #[test]
    fn faithful_upload_has_no_mismatches(words in prop::collection::vec(any::<u16>(), 0..=ROM_WORDS)) {
        let image = RomImage::from_words(&words);
        let mut regs = handle();

        prop_assert_eq!(upload(&image, &mut regs).unwrap(), words.len());
        let mismatches = verify(&image, &mut regs, |_, _| Ok(())).unwrap();
        prop_assert!(mismatches.is_empty());
        for (i, w) in words.iter().enumerate() {
            prop_assert_eq!(regs.bus().rom(i), Some(*w));
        }
    }

    #[test]
    fn single_fault_lands_in_sim(
        words in prop::collection::vec(any::<u16>(), 1..=ROM_WORDS),
        pick in any::<prop::sample::Index>(),
        flip in 1u16..,
    ) {
        let image = RomImage::from_words(&words);
        let k = pick.index(words.len());
        let forced = words[k] ^ flip;

        let mut regs = handle();
        regs.bus_mut().corrupt_rom(k, forced);
        let report = Controller::new(HarnessConfig::new(HandshakeMode::VerifyReport))
            .run(&image, &mut regs)
            .unwrap();

        let expected = ((k as u32) << 16) | u32::from(forced);
        prop_assert_eq!(regs.bus().register(Register::Sim), expected);
        prop_assert_eq!(report.mismatches.len(), 1);
        prop_assert_eq!(report.mismatches[0].index, k);
    }

    #[test]
    fn diagnostic_fields_round_trip(index in 0usize..=0xffff, observed in any::<u16>()) {
        let word = diagnostic::mismatch(index, u32::from(observed));
        prop_assert_eq!(diagnostic::index(word), index as u32);
        prop_assert_eq!(diagnostic::observed(word), u32::from(observed));
    }

    #[test]
    fn image_bytes_decode(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let decoded = RomImage::from_le_bytes(bytes.clone());
        if bytes.len() % 2 == 0 {
            let image = decoded.unwrap();
            prop_assert_eq!(image.len(), bytes.len() / 2);
            prop_assert_eq!(image.as_bytes(), bytes.as_slice());
        } else {
            prop_assert!(decoded.is_err());
        }
    }
}
