//! Module calls provided to the guest.
//!
//! Arguments arrive in `P0..P3` and the result goes to `R0`. Pointers are
//! guest addresses; a string is a NUL-terminated run of bytes.

use std::collections::HashMap;
use std::time::Instant;

use time::OffsetDateTime;
use tracing::{debug, info};
use vmgp::{host_fn, Error, HostFunction, Interpreter};

/// Size of the date record written by `vGetTimeDate`.
const DATE_TIME_SIZE: usize = 8;

pub fn module_calls() -> HashMap<String, HostFunction> {
    let start = Instant::now();
    let mut calls = HashMap::new();
    calls.insert(
        "vTerminateVMGP".to_string(),
        host_fn(|cpu| {
            info!(ticks = cpu.ticks(), "program requested termination");
            cpu.terminate();
            Ok(())
        }),
    );
    calls.insert(
        "vGetTickCount".to_string(),
        host_fn(move |cpu| {
            cpu.set_result(start.elapsed().as_millis() as u32);
            Ok(())
        }),
    );
    calls.insert(
        "vGetTimeDate".to_string(),
        host_fn(|cpu| {
            let now = OffsetDateTime::now_local().unwrap_or_else(|e| {
                debug!(error = %e, "local offset unavailable, using UTC");
                OffsetDateTime::now_utc()
            });
            write_date_time(cpu, now)
        }),
    );
    calls.insert(
        "vGetTimeDateUTC".to_string(),
        host_fn(|cpu| write_date_time(cpu, OffsetDateTime::now_utc())),
    );
    calls.insert("vStrCpy".to_string(), host_fn(str_cpy));
    calls.insert("vStrLen".to_string(), host_fn(str_len));
    calls.insert(
        "vitoa".to_string(),
        host_fn(|cpu| {
            let [value, ..] = cpu.args();
            write_number(cpu, &(value as i32).to_string())
        }),
    );
    calls.insert(
        "vutoa".to_string(),
        host_fn(|cpu| {
            let [value, ..] = cpu.args();
            write_number(cpu, &value.to_string())
        }),
    );
    calls
}

/// `vStrCpy(dest, src)`: copies up to and including the terminator. Also used
/// as a byte copy by some programs, so it goes one byte at a time. Returns the
/// address of the copied terminator.
fn str_cpy(cpu: &mut Interpreter) -> Result<(), Error> {
    let [mut dest, mut src, ..] = cpu.args();
    loop {
        let byte = cpu.memory().read_u8(src)?;
        cpu.memory_mut().write_u8(dest, byte)?;
        if byte == 0 {
            break;
        }
        src = src.wrapping_add(1);
        dest = dest.wrapping_add(1);
    }
    cpu.set_result(dest);
    Ok(())
}

fn str_len(cpu: &mut Interpreter) -> Result<(), Error> {
    let [addr, ..] = cpu.args();
    let mut len = 0u32;
    while cpu.memory().read_u8(addr.wrapping_add(len))? != 0 {
        len += 1;
    }
    cpu.set_result(len);
    Ok(())
}

/// `(value, buf, len, pad)`: writes the digits, right-pads with `pad` up to
/// `len` bytes and terminates. Longer numbers are not truncated. Returns
/// `buf + len`.
fn write_number(cpu: &mut Interpreter, digits: &str) -> Result<(), Error> {
    let [_, buf, len, pad] = cpu.args();
    let len = len as u8 as usize;
    let mut text = digits.as_bytes().to_vec();
    if text.len() < len {
        text.resize(len, pad as u8);
    }
    text.push(0);
    cpu.memory_mut().write_bytes(buf, &text)?;
    cpu.set_result(buf.wrapping_add(len as u32));
    Ok(())
}

/// Date record at `P0`: second, minute, hour, weekday (0 = Sunday), day of
/// month, month (1-12), then the year as a 16-bit word.
fn write_date_time(cpu: &mut Interpreter, now: OffsetDateTime) -> Result<(), Error> {
    let [addr, ..] = cpu.args();
    let mut record = [0; DATE_TIME_SIZE];
    record[0] = now.second();
    record[1] = now.minute();
    record[2] = now.hour();
    record[3] = now.weekday().number_days_from_sunday();
    record[4] = now.day();
    record[5] = u8::from(now.month());
    record[6..].copy_from_slice(&(now.year() as u16).to_ne_bytes());
    cpu.memory_mut().write_bytes(addr, &record)
}
