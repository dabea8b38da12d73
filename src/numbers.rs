//! Bounded newtypes for wire-level numeric fields, built on the `clamp!`
//! macro. Values are only ever constructed here after the decoder has
//! already validated the raw byte against the documented range, so `new`'s
//! silent clamping never actually fires on the parse path — it is the same
//! safety net the macro gives every other user of it.

clamp!(Channel, u8, 0, 15, 0, pub);
clamp!(NoteNumber, u8, 0, 127, 60, pub);
clamp!(Velocity, u8, 0, 127, 64, pub);
clamp!(ControlNumber, u8, 0, 127, 0, pub);
clamp!(ControlValue, u8, 0, 127, 0, pub);
clamp!(ProgramNumber, u8, 0, 127, 0, pub);
clamp!(PressureValue, u8, 0, 127, 0, pub);
clamp!(PitchBend, i16, -8192, 8191, 0, pub);

// -7 is 7 flats, +7 is 7 sharps.
clamp!(KeyAccidentals, i8, -7, 7, 0, pub);
