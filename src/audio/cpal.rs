// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, Level};

use super::context::AudioContext;
use super::thread_priority::CallbackPriority;
use super::{Device as AudioDevice, OutputHandle};
use crate::config;

/// How often the stream thread checks whether it should shut down.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A small wrapper around a cpal::Device carrying the output settings it
/// should be opened with.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// Output settings requested by the configuration.
    audio_config: config::Audio,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// Builds a callback that renders the context directly into the device buffer.
fn create_f32_callback(
    context: Arc<AudioContext>,
) -> impl FnMut(&mut [f32], &cpal::OutputCallbackInfo) + Send + 'static {
    let mut priority = CallbackPriority::from_env();

    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        priority.apply_once();
        context.render(data);
    }
}

/// Builds a callback that renders into scratch space and converts to the
/// device's integer format.
fn create_converting_callback<T>(
    context: Arc<AudioContext>,
) -> impl FnMut(&mut [T], &cpal::OutputCallbackInfo) + Send + 'static
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut priority = CallbackPriority::from_env();
    let mut scratch: Vec<f32> = Vec::new();

    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        priority.apply_once();
        if scratch.len() != data.len() {
            scratch.resize(data.len(), 0.0);
        }
        context.render(&mut scratch);
        for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
            *dst = T::from_sample(src);
        }
    }
}

fn build_stream(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    context: Arc<AudioContext>,
) -> Result<cpal::Stream, Box<dyn Error>> {
    let on_error = |err: cpal::StreamError| error!("CPAL output stream error: {}", err);
    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_output_stream(
            stream_config,
            create_f32_callback(context),
            on_error,
            None,
        )?,
        cpal::SampleFormat::I16 => device.build_output_stream(
            stream_config,
            create_converting_callback::<i16>(context),
            on_error,
            None,
        )?,
        cpal::SampleFormat::I32 => device.build_output_stream(
            stream_config,
            create_converting_callback::<i32>(context),
            on_error,
            None,
        )?,
        other => return Err(format!("unsupported sample format {}", other).into()),
    };
    Ok(stream)
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn AudioDevice>>, Box<dyn Error>> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn AudioDevice> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices.
    fn list_cpal_devices() -> Result<Vec<Device>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let Ok(output_configs) = device.supported_output_configs() else {
                    continue;
                };
                let max_channels = output_configs
                    .map(|output_config| output_config.channels())
                    .max()
                    .unwrap_or(0);

                if max_channels > 0 {
                    devices.push(Device {
                        name: device.name()?,
                        max_channels,
                        host_id,
                        device,
                        audio_config: config::Audio::new("default"),
                    })
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the given cpal device.
    pub fn get(config: config::Audio) -> Result<Device, Box<dyn Error>> {
        let name = config.device().to_string();
        match Device::list_cpal_devices()?
            .into_iter()
            .find(|device| device.name.trim() == name)
        {
            Some(mut device) => {
                if device.max_channels < config.channels() {
                    return Err(format!(
                        "{} channels requested, audio device {} only has {}",
                        config.channels(),
                        device.name,
                        device.max_channels
                    )
                    .into());
                }
                device.audio_config = config;
                Ok(device)
            }
            None => Err(format!("no device found with name {}", name).into()),
        }
    }
}

impl AudioDevice for Device {
    fn start(&self, context: Arc<AudioContext>) -> Result<OutputHandle, Box<dyn Error>> {
        let span = span!(Level::INFO, "output stream (cpal)");
        let _enter = span.enter();

        let sample_format = self.device.default_output_config()?.sample_format();
        let stream_config = cpal::StreamConfig {
            channels: context.num_channels(),
            sample_rate: context.sample_rate(),
            buffer_size: cpal::BufferSize::Fixed(self.audio_config.buffer_size()),
        };
        info!(
            device = self.name,
            sample_rate = context.sample_rate(),
            channels = context.num_channels(),
            buffer_size = self.audio_config.buffer_size(),
            format = %sample_format,
            "Starting output stream."
        );

        let stop = Arc::new(AtomicBool::new(false));
        let (started_tx, started_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);
        let device = self.device.clone();

        // The stream isn't Send on every platform, so it is created and kept
        // alive on its own thread.
        let join = {
            let stop = stop.clone();
            thread::spawn(move || {
                let stream = match build_stream(&device, &stream_config, sample_format, context)
                    .and_then(|stream| {
                        stream.play()?;
                        Ok(stream)
                    }) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = started_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                let _ = started_tx.send(Ok(()));

                while !stop.load(Ordering::Relaxed) {
                    thread::sleep(STOP_POLL_INTERVAL);
                }
                drop(stream);
            })
        };

        match started_rx.recv() {
            Ok(Ok(())) => {
                info!("CPAL output stream started successfully");
                Ok(OutputHandle::new(stop, join))
            }
            Ok(Err(e)) => {
                let _ = join.join();
                Err(format!("failed to start output stream: {}", e).into())
            }
            Err(_) => {
                let _ = join.join();
                Err("output stream thread exited unexpectedly".into())
            }
        }
    }
}
