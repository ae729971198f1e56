//! Main hexapod executable entry point.
//!
//! # Architecture
//!
//! The executable runs two loops:
//!
//!     - The control loop, on its own thread, which reads the motion request, steps motion
//!       control and sends the resulting frames to the servos.
//!     - The telecommand loop, on the main thread, which recieves TCs from a script or the
//!       remote TcClient and writes them into the motion request.
//!
//! # Modules
//!
//! All cyclic modules (e.g. `motion_ctrl`) shall provide a public struct implementing the
//! `util::module::State` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Report, eyre::{WrapErr, eyre}};
use log::{debug, error, info, warn};
use std::env;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use comms_if::tc::TcResponse;
use hex_lib::{
    motion_ctrl::{ControlLoop, DryRunTransport, InitData, MotionCtrl, ServoTransport},
    params::HexExecParams,
    request::RequestSurface,
    servo_client::ServoClient,
    tc_client::{TcClient, TcClientError, TcFaultCounter},
    tc_processor
};
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
    script_interpreter::{ScriptInterpreter, PendingTcs}
};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the telecommands incoming to the exec.
enum TcSource {
    Remote(TcClient),
    Script(ScriptInterpreter)
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new(
        "hex_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Hexapod Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: HexExecParams = util::params::load("hex_exec.toml")
        .wrap_err("Could not load exec params")?;
    session.save("hex_exec_params.json", exec_params.clone());

    info!("Exec parameters loaded");

    // ---- INITIALISE TC SOURCE ----

    let args: Vec<String> = env::args().collect();
    debug!("CLI arguments: {:?}", args);

    let script = match args.len() {
        2 => {
            info!("Loading script from \"{}\"", &args[1]);

            let si = ScriptInterpreter::new(&args[1])
                .wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} TCs\n",
                si.get_duration(),
                si.get_num_tcs()
            );

            Some(si)
        },
        1 => {
            info!("No script provided, remote control via the TcClient will be used\n");
            None
        },
        n => return Err(eyre!("Expected either zero or one argument, found {}", n - 1))
    };

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut motion_ctrl = MotionCtrl::default();
    motion_ctrl.init(
        InitData {
            params_file: "motion_ctrl.toml",
            channels_file: "servo_channels.toml"
        },
        &session
    ).wrap_err("Failed to initialise MotionCtrl")?;

    // Enough time for the frame in flight, the settle and the release frame
    let shutdown_wait = {
        let p = motion_ctrl.params();
        p.settle_delay() + p.idle_period() + Duration::from_millis(2 * p.ack_margin_ms)
    };

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = comms_if::net::zmq::Context::new();

    let mut tc_source = match script {
        Some(si) => TcSource::Script(si),
        None => {
            let c = TcClient::new(&zmq_ctx, &exec_params)
                .wrap_err("Failed to initialise the TcClient")?;
            info!("TcClient initialised");
            TcSource::Remote(c)
        }
    };

    let transport: Box<dyn ServoTransport + Send> = match exec_params.dry_run {
        true => {
            info!("Dry run, servo frames will only be logged");
            Box::new(DryRunTransport::new())
        },
        false => {
            let c = ServoClient::new(&zmq_ctx, &exec_params)
                .wrap_err("Failed to initialise the ServoClient")?;
            info!("ServoClient initialised");
            Box::new(c)
        }
    };

    info!("Network initialisation complete");

    // ---- START CONTROL LOOP ----

    let surface = RequestSurface::default();

    let control_loop = ControlLoop::spawn(motion_ctrl, transport, surface.clone())
        .wrap_err("Failed to start the control loop")?;

    // ---- TC LOOP ----

    info!("Begining TC loop\n");

    let cycle_period = Duration::from_millis(exec_params.cycle_period_ms);
    let mut tc_connected = false;
    let mut tc_faults = TcFaultCounter::new(exec_params.max_tc_faults);

    loop {
        let cycle_start = Instant::now();

        match tc_source {
            TcSource::Remote(ref mut client) => {
                // Stop walking if the operator is lost
                if client.is_connected() != tc_connected {
                    tc_connected = client.is_connected();

                    match tc_connected {
                        true => info!("Connected to the ground console"),
                        false => {
                            error!("Ground console connection lost, disabling movement");
                            surface.request_set_movement(false);
                        }
                    }
                }

                let served = client.serve(|tc| {
                    tc_processor::exec(&surface, tc);
                    TcResponse::Ok
                });

                match served {
                    Ok(_) | Err(TcClientError::NotConnected) => (),
                    Err(ref e) => warn!("Error while serving TCs: {}", e)
                }

                // Persistent faults end the session through the normal shutdown
                if !tc_faults.record(&served) {
                    error!(
                        "{} consecutive TC faults, shutting down",
                        tc_faults.consecutive()
                    );
                    break
                }
            },

            TcSource::Script(ref mut si) => match si.get_pending_tcs() {
                PendingTcs::None => (),
                PendingTcs::Some(tcs) => {
                    for tc in tcs.iter() {
                        tc_processor::exec(&surface, tc);
                    }
                },
                PendingTcs::EndOfScript => {
                    info!("End of TC script reached, stopping");
                    break
                }
            }
        }

        if !control_loop.is_running() {
            return Err(eyre!("The control loop stopped unexpectedly"))
        }

        let cycle_dur = cycle_start.elapsed();
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "TC cycle overran by {:.06} s",
                (cycle_dur - cycle_period).as_secs_f64()
            )
        }
    }

    // ---- SHUTDOWN ----

    info!("Disabling movement");
    surface.request_set_movement(false);

    let frame_time = Duration::from_millis(surface.snapshot().gait_speed_ms as u64);
    thread::sleep(shutdown_wait + frame_time);

    let stats = control_loop.stop();
    info!(
        "Control loop ran {} ticks, sent {} frames ({} send failures, {} ack timeouts, {} ack \
         failures)",
        stats.ticks, stats.frames_sent, stats.send_failures, stats.ack_timeouts, stats.ack_failures
    );
    session.save("loop_stats.json", stats);

    info!("End of execution");

    session.exit();

    Ok(())
}
